pub mod relay;

pub use relay::{attachment_key, normalize_phone, resolve_attachment, Messenger, RelayClient};
