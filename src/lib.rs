//! PersonaLens: conversational assistant over a personal photo library.
//!
//! Each chat turn injects live account context into a system prompt, asks a
//! hosted completion model for a reply, and either passes the reply through
//! or executes the single account-scoped tool call it encodes.

pub mod chat;
pub mod config;
pub mod groq;
pub mod messaging;
pub mod server;
pub mod state;
pub mod tools;
pub mod types;
