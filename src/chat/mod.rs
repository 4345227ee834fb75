pub mod classifier;
pub mod context;
pub mod prompt;
pub mod turn;

pub use classifier::{classify, Classified, ToolInvocation};
pub use context::{build_account_context, AccountContext};
pub use prompt::build_system_prompt;
pub use turn::{ChatError, ChatService};
