//! Shared types used across the PersonaLens backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// A chat message in the multi-turn conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// What a single turn hands back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<ToolResult>,
}

// ---------------------------------------------------------------------------
// Tool results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Error,
}

/// Uniform result returned by every tool handler.
///
/// Serialises flat: `{"status": .., "message": .., <extra keys>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub status: ToolStatus,
    pub message: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ToolResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Success,
            message: message.into(),
            extra: serde_json::Map::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            message: message.into(),
            extra: serde_json::Map::new(),
        }
    }

    /// Attach an extra payload field.
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
        self.extra.insert(key.to_string(), value);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }
}

// ---------------------------------------------------------------------------
// Library records
// ---------------------------------------------------------------------------

/// Photo categories assigned at upload time or by `move_photo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhotoCategory {
    Person,
    Receipt,
    Document,
    Note,
    General,
}

impl PhotoCategory {
    pub const ALL: [PhotoCategory; 5] = [
        Self::Person,
        Self::Receipt,
        Self::Document,
        Self::Note,
        Self::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "Person",
            Self::Receipt => "Receipt",
            Self::Document => "Document",
            Self::Note => "Note",
            Self::General => "General",
        }
    }
}

impl fmt::Display for PhotoCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhotoCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown photo category: {s}"))
    }
}

/// An account owning photos, people, receipts and vault files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Outgoing-mail credentials stored per account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpCredentials {
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: i64,
    pub filename: String,
    pub category: String,
    pub path: String,
    pub is_sensitive: bool,
    pub created_at: String,
}

/// Input for inserting a photo row.
#[derive(Debug, Clone)]
pub struct NewPhoto<'a> {
    pub path: &'a str,
    pub filename: &'a str,
    pub category: PhotoCategory,
    pub is_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonSummary {
    pub id: i64,
    pub name: String,
    pub tagged_photos: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: i64,
    pub merchant: Option<String>,
    pub amount: Option<f64>,
    pub date: Option<String>,
    pub category: Option<String>,
}

/// A receipt joined with its photo, as listed by `GET /receipts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptDetail {
    pub id: i64,
    pub merchant: Option<String>,
    pub amount: Option<f64>,
    pub tax: Option<f64>,
    pub date: Option<String>,
    pub category: Option<String>,
    pub photo_path: String,
    pub uploaded_at: String,
}

/// Input for inserting a receipt row.
#[derive(Debug, Clone, Default)]
pub struct NewReceipt<'a> {
    pub merchant: Option<&'a str>,
    pub date: Option<&'a str>,
    pub amount: Option<f64>,
    pub tax: Option<f64>,
    pub category: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultEntry {
    pub id: i64,
    pub filename: String,
    pub added: String,
}

/// Aggregate counts for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_photos: u64,
    pub total_vault: u64,
    pub total_receipts: u64,
    pub total_people: u64,
    pub storage_used_gb: f64,
    pub storage_limit_gb: u32,
}

/// Estimated on-disk footprint per photo, in MB.
const PHOTO_MB: f64 = 2.0;
/// Estimated on-disk footprint per vault file, in MB.
const VAULT_MB: f64 = 1.5;
/// Free tier storage limit.
const STORAGE_LIMIT_GB: u32 = 10;

impl DashboardStats {
    pub fn new(photos: u64, vault: u64, receipts: u64, people: u64) -> Self {
        let used_mb = photos as f64 * PHOTO_MB + vault as f64 * VAULT_MB;
        Self {
            total_photos: photos,
            total_vault: vault,
            total_receipts: receipts,
            total_people: people,
            storage_used_gb: round2(used_mb / 1024.0),
            storage_limit_gb: STORAGE_LIMIT_GB,
        }
    }
}

/// Round to two decimal places.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_result_serializes_flat() {
        let result = ToolResult::success("Found 2 photo(s)").with("count", 2);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({"status": "success", "message": "Found 2 photo(s)", "count": 2})
        );
    }

    #[test]
    fn reply_omits_missing_tool_result() {
        let reply = ChatReply {
            response: "hi".into(),
            tool_result: None,
        };
        assert_eq!(serde_json::to_value(&reply).unwrap(), json!({"response": "hi"}));
    }

    #[test]
    fn category_parse_is_exact() {
        assert_eq!("Receipt".parse::<PhotoCategory>(), Ok(PhotoCategory::Receipt));
        assert!("receipt".parse::<PhotoCategory>().is_err());
    }

    #[test]
    fn dashboard_storage_estimate() {
        let stats = DashboardStats::new(512, 0, 3, 1);
        assert_eq!(stats.storage_used_gb, 1.0);
        assert_eq!(stats.storage_limit_gb, 10);
    }
}
