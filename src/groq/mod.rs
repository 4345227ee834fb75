pub mod client;

pub use client::{Completion, CompletionError, GroqClient};
