use crate::chat::ChatService;
use crate::state::Database;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared handles for every request.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub chat: ChatService,
    /// Root that photo paths are relative to.
    pub uploads_dir: PathBuf,
}

impl AppState {
    pub fn new(db: Arc<Mutex<Database>>, chat: ChatService, uploads_dir: PathBuf) -> Self {
        Self {
            db,
            chat,
            uploads_dir,
        }
    }
}
