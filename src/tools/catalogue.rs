//! Static tool catalogue shown to the model and served on `GET /tools`.

use crate::types::PhotoCategory;
use serde::Serialize;
use serde_json::{json, Value};

/// Catalogue sections, in prompt order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolGroup {
    Photos,
    People,
    Receipts,
    Vault,
    Messaging,
}

impl ToolGroup {
    pub const ALL: [ToolGroup; 5] = [
        Self::Photos,
        Self::People,
        Self::Receipts,
        Self::Vault,
        Self::Messaging,
    ];

    pub fn heading(&self) -> &'static str {
        match self {
            Self::Photos => "📷 PHOTOS",
            Self::People => "👥 PEOPLE",
            Self::Receipts => "🧾 RECEIPTS",
            Self::Vault => "🔐 VAULT",
            Self::Messaging => "📨 MESSAGING",
        }
    }
}

/// Metadata for one tool.
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub group: ToolGroup,
    /// Call shape as presented to the model.
    pub signature: &'static str,
    pub description: &'static str,
    /// Extra usage note rendered under the entry.
    pub note: Option<&'static str>,
    schema: fn() -> Value,
}

impl ToolSpec {
    /// JSON Schema of the `args` object.
    pub fn parameters(&self) -> Value {
        (self.schema)()
    }
}

/// Serializable view of a catalogue entry.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub group: ToolGroup,
    pub signature: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

impl From<&ToolSpec> for ToolDefinition {
    fn from(spec: &ToolSpec) -> Self {
        Self {
            name: spec.name,
            group: spec.group,
            signature: spec.signature,
            description: spec.description,
            parameters: spec.parameters(),
        }
    }
}

pub const CATALOGUE: &[ToolSpec] = &[
    ToolSpec {
        name: "list_photos",
        group: ToolGroup::Photos,
        signature: "list_photos(category=None)",
        description: "list all photos; category: Person/Receipt/Document/Note/General",
        note: None,
        schema: list_photos_schema,
    },
    ToolSpec {
        name: "delete_photo",
        group: ToolGroup::Photos,
        signature: "delete_photo(photo_id)",
        description: "permanently delete a photo from disk and library",
        note: None,
        schema: photo_ref_schema,
    },
    ToolSpec {
        name: "move_photo",
        group: ToolGroup::Photos,
        signature: "move_photo(photo_id, category)",
        description: "move photo to a different category",
        note: None,
        schema: move_photo_schema,
    },
    ToolSpec {
        name: "list_people",
        group: ToolGroup::People,
        signature: "list_people()",
        description: "list all named people",
        note: None,
        schema: no_args_schema,
    },
    ToolSpec {
        name: "create_person",
        group: ToolGroup::People,
        signature: "create_person(name)",
        description: "create a new person profile",
        note: None,
        schema: create_person_schema,
    },
    ToolSpec {
        name: "tag_person_in_photo",
        group: ToolGroup::People,
        signature: "tag_person_in_photo(photo_id, person_id)",
        description: "tag who is in a photo",
        note: None,
        schema: tag_person_schema,
    },
    ToolSpec {
        name: "get_receipt_summary",
        group: ToolGroup::Receipts,
        signature: "get_receipt_summary()",
        description: "show spending totals and category breakdown",
        note: None,
        schema: no_args_schema,
    },
    ToolSpec {
        name: "delete_receipt",
        group: ToolGroup::Receipts,
        signature: "delete_receipt(receipt_id)",
        description: "delete a receipt record",
        note: None,
        schema: receipt_ref_schema,
    },
    ToolSpec {
        name: "list_vault",
        group: ToolGroup::Vault,
        signature: "list_vault()",
        description: "list all files in the secure vault",
        note: None,
        schema: no_args_schema,
    },
    ToolSpec {
        name: "send_email",
        group: ToolGroup::Messaging,
        signature: "send_email(to_email, subject, message)",
        description: "send email from the user's configured mailbox",
        note: None,
        schema: send_email_schema,
    },
    ToolSpec {
        name: "send_whatsapp",
        group: ToolGroup::Messaging,
        signature: "send_whatsapp(phone_number, message, image_path=None)",
        description: "send WhatsApp text or image",
        note: Some(
            "image_path MUST be the exact file path like \"uploads/photos/uuid.jpg\" (NOT the photo ID)",
        ),
        schema: send_whatsapp_schema,
    },
];

/// Look up a catalogue entry by tool name.
pub fn find(name: &str) -> Option<&'static ToolSpec> {
    CATALOGUE.iter().find(|spec| spec.name == name)
}

/// Serializable catalogue for API consumers.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    CATALOGUE.iter().map(ToolDefinition::from).collect()
}

fn no_args_schema() -> Value {
    object(json!({}), &[])
}

fn list_photos_schema() -> Value {
    object(json!({"category": category_schema()}), &[])
}

fn photo_ref_schema() -> Value {
    object(json!({"photo_id": {"type": "integer"}}), &["photo_id"])
}

fn move_photo_schema() -> Value {
    object(
        json!({"photo_id": {"type": "integer"}, "category": category_schema()}),
        &["photo_id", "category"],
    )
}

fn create_person_schema() -> Value {
    object(json!({"name": {"type": "string"}}), &["name"])
}

fn tag_person_schema() -> Value {
    object(
        json!({"photo_id": {"type": "integer"}, "person_id": {"type": "integer"}}),
        &["photo_id", "person_id"],
    )
}

fn receipt_ref_schema() -> Value {
    object(json!({"receipt_id": {"type": "integer"}}), &["receipt_id"])
}

fn send_email_schema() -> Value {
    object(
        json!({
            "to_email": {"type": "string"},
            "subject": {"type": "string"},
            "message": {"type": "string"}
        }),
        &["to_email", "subject", "message"],
    )
}

fn send_whatsapp_schema() -> Value {
    object(
        json!({
            "phone_number": {"type": "string"},
            "message": {"type": "string"},
            "image_path": {"type": "string"}
        }),
        &["phone_number", "message"],
    )
}

fn category_schema() -> Value {
    let names: Vec<&str> = PhotoCategory::ALL.iter().map(|c| c.as_str()).collect();
    json!({"type": "string", "enum": names})
}

fn object(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}
