//! Typed tool commands decoded from the model's `{"tool", "args"}` object.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Why an invocation could not be turned into a command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolArgsError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArgs { tool: &'static str, reason: String },
}

/// One executable tool call. Any account id the model supplies is ignored;
/// handlers use the account bound to the turn.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCommand {
    ListPhotos(ListPhotosArgs),
    DeletePhoto(PhotoRef),
    MovePhoto(MovePhotoArgs),
    ListPeople,
    CreatePerson(CreatePersonArgs),
    TagPersonInPhoto(TagPersonArgs),
    GetReceiptSummary,
    DeleteReceipt(ReceiptRef),
    ListVault,
    SendEmail(SendEmailArgs),
    SendWhatsApp(SendWhatsAppArgs),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListPhotosArgs {
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PhotoRef {
    #[serde(deserialize_with = "record_id")]
    pub photo_id: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MovePhotoArgs {
    #[serde(deserialize_with = "record_id")]
    pub photo_id: i64,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatePersonArgs {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TagPersonArgs {
    #[serde(deserialize_with = "record_id")]
    pub photo_id: i64,
    #[serde(deserialize_with = "record_id")]
    pub person_id: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReceiptRef {
    #[serde(deserialize_with = "record_id")]
    pub receipt_id: i64,
}

/// Model-visible email fields. Sender credentials are never taken from here.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SendEmailArgs {
    pub to_email: String,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SendWhatsAppArgs {
    pub phone_number: String,
    pub message: String,
    #[serde(default)]
    pub image_path: Option<String>,
}

impl ToolCommand {
    /// Decode a named invocation into a typed command.
    pub fn parse(name: &str, args: Map<String, Value>) -> Result<Self, ToolArgsError> {
        let command = match name {
            "list_photos" => Self::ListPhotos(decode("list_photos", args)?),
            "delete_photo" => Self::DeletePhoto(decode("delete_photo", args)?),
            "move_photo" => Self::MovePhoto(decode("move_photo", args)?),
            "list_people" => Self::ListPeople,
            "create_person" => Self::CreatePerson(decode("create_person", args)?),
            "tag_person_in_photo" => Self::TagPersonInPhoto(decode("tag_person_in_photo", args)?),
            "get_receipt_summary" => Self::GetReceiptSummary,
            "delete_receipt" => Self::DeleteReceipt(decode("delete_receipt", args)?),
            "list_vault" => Self::ListVault,
            "send_email" => Self::SendEmail(decode("send_email", args)?),
            "send_whatsapp" => Self::SendWhatsApp(decode("send_whatsapp", args)?),
            other => return Err(ToolArgsError::UnknownTool(other.to_string())),
        };
        Ok(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ListPhotos(_) => "list_photos",
            Self::DeletePhoto(_) => "delete_photo",
            Self::MovePhoto(_) => "move_photo",
            Self::ListPeople => "list_people",
            Self::CreatePerson(_) => "create_person",
            Self::TagPersonInPhoto(_) => "tag_person_in_photo",
            Self::GetReceiptSummary => "get_receipt_summary",
            Self::DeleteReceipt(_) => "delete_receipt",
            Self::ListVault => "list_vault",
            Self::SendEmail(_) => "send_email",
            Self::SendWhatsApp(_) => "send_whatsapp",
        }
    }
}

fn decode<T: DeserializeOwned>(tool: &'static str, args: Map<String, Value>) -> Result<T, ToolArgsError> {
    serde_json::from_value(Value::Object(args)).map_err(|e| ToolArgsError::InvalidArgs {
        tool,
        reason: e.to_string(),
    })
}

/// Record ids arrive as integers or as numeric strings.
fn record_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Int(i64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Int(id) => Ok(id),
        RawId::Text(s) => s
            .trim()
            .trim_start_matches('#')
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid record id: {s:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn parses_argument_free_tools() {
        assert_eq!(ToolCommand::parse("list_people", Map::new()), Ok(ToolCommand::ListPeople));
        assert_eq!(ToolCommand::parse("list_vault", Map::new()), Ok(ToolCommand::ListVault));
    }

    #[test]
    fn ids_accept_numbers_and_numeric_strings() {
        let a = ToolCommand::parse("delete_photo", args(json!({"photo_id": 7}))).unwrap();
        let b = ToolCommand::parse("delete_photo", args(json!({"photo_id": "7"}))).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, ToolCommand::DeletePhoto(PhotoRef { photo_id: 7 }));
    }

    #[test]
    fn model_supplied_account_is_ignored() {
        let cmd = ToolCommand::parse(
            "tag_person_in_photo",
            args(json!({"photo_id": 1, "person_id": "2", "user_id": 99})),
        )
        .unwrap();
        assert_eq!(
            cmd,
            ToolCommand::TagPersonInPhoto(TagPersonArgs {
                photo_id: 1,
                person_id: 2
            })
        );
    }

    #[test]
    fn unknown_tool_is_reported() {
        let err = ToolCommand::parse("format_disk", Map::new()).unwrap_err();
        assert_eq!(err, ToolArgsError::UnknownTool("format_disk".into()));
    }

    #[test]
    fn missing_required_args_are_invalid() {
        let err = ToolCommand::parse("move_photo", args(json!({"photo_id": 3}))).unwrap_err();
        assert!(matches!(err, ToolArgsError::InvalidArgs { tool: "move_photo", .. }));

        let err = ToolCommand::parse("delete_receipt", args(json!({"receipt_id": "abc"}))).unwrap_err();
        assert!(matches!(err, ToolArgsError::InvalidArgs { tool: "delete_receipt", .. }));
    }

    #[test]
    fn email_credentials_in_args_are_dropped() {
        let cmd = ToolCommand::parse(
            "send_email",
            args(json!({
                "to_email": "x@example.com",
                "subject": "Hi",
                "message": "Body",
                "smtp_user": "attacker@example.com",
                "smtp_pass": "hunter2"
            })),
        )
        .unwrap();
        assert_eq!(
            cmd,
            ToolCommand::SendEmail(SendEmailArgs {
                to_email: "x@example.com".into(),
                subject: "Hi".into(),
                message: "Body".into(),
            })
        );
    }
}
