use crate::types::ChatMessage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Prior turns, oldest first. The server keeps no history of its own.
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmtpSettings {
    #[serde(default)]
    pub smtp_email: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhotoQuery {
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryUpdate {
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoMoved {
    pub message: String,
    pub photo_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPersonRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonResponse {
    pub id: i64,
    pub name: String,
    pub photo_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagPhotoRequest {
    pub photo_id: i64,
    pub person_id: i64,
}

/// One row of `GET /receipts`; missing fields get display defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptRow {
    pub id: i64,
    pub merchant: String,
    pub amount: f64,
    pub tax: f64,
    pub date: Option<String>,
    pub category: String,
    pub photo_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptListing {
    pub receipts: Vec<ReceiptRow>,
    pub total_all_time: f64,
    pub total_this_month: f64,
    pub count: usize,
}
