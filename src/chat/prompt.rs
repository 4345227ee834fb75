//! System prompt assembly.
//!
//! Sections (in order):
//! 1. Persona and behaviour
//! 2. Account context
//! 3. Tool catalogue, grouped
//! 4. Rules and the tool-call format
//!
//! Rendering is pure: the same context always yields the same bytes.

use crate::chat::context::AccountContext;
use crate::tools::{ToolGroup, CATALOGUE};
use std::fmt::Write;

const RULES: &str = r#"=== RULES ===
- The account is fixed for this conversation; never ask for or pass a user id
- When you need IDs or Paths, call list_photos first
- For WhatsApp images: use the 'path' from list_photos or the recent uploads (e.g., 'photos/uuid.jpg') and prefix with 'uploads/'
- Before deleting anything, tell the user what you're about to delete and confirm
- To call a tool, respond with ONLY this JSON (nothing else):
{"tool": "tool_name", "args": {"arg": "value"}}
- For normal replies, use plain text only"#;

/// Build the system message for one turn.
pub fn build_system_prompt(assistant_name: &str, ctx: &AccountContext) -> String {
    let mut prompt = String::with_capacity(4096);

    let _ = writeln!(
        prompt,
        "You are {assistant_name}, a powerful AI assistant with FULL ACCESS to the user's photo library, people, receipts, vault, and messaging."
    );
    prompt.push_str("Be helpful, concise, and action-oriented. Always confirm before deleting.\n\n");

    prompt.push_str("=== USER CONTEXT ===\n");
    let _ = writeln!(prompt, "- Total Photos: {}", ctx.photo_count);
    let _ = writeln!(prompt, "- Recognized People: {}", ctx.person_count);
    let _ = writeln!(prompt, "- Recent Uploads: {}", recent_uploads(ctx));
    let _ = writeln!(prompt, "- Total Receipt Spending: ₹{:.2}", ctx.receipt_total);
    prompt.push('\n');

    prompt.push_str("=== AVAILABLE TOOLS ===\n");
    prompt.push_str("You have FULL CONTROL. Use these tools when the user asks you to act:\n");
    let mut number = 0;
    for group in ToolGroup::ALL {
        let _ = write!(prompt, "\n{}:\n", group.heading());
        for spec in CATALOGUE.iter().filter(|s| s.group == group) {
            number += 1;
            let _ = writeln!(prompt, "{number}. {} — {}", spec.signature, spec.description);
            if let Some(note) = spec.note {
                let _ = writeln!(prompt, "    - {note}");
            }
        }
    }
    prompt.push('\n');

    prompt.push_str(RULES);
    prompt
}

fn recent_uploads(ctx: &AccountContext) -> String {
    if ctx.recent_photos.is_empty() {
        return "None".to_string();
    }
    ctx.recent_photos
        .iter()
        .map(|p| format!("Photo {} ({}, path: {})", p.id, p.category, p.path))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::context::RecentPhoto;

    fn sample_context() -> AccountContext {
        AccountContext {
            account_id: 7,
            photo_count: 12,
            person_count: 2,
            recent_photos: vec![
                RecentPhoto {
                    id: 12,
                    category: "Receipt".into(),
                    path: "photos/b.jpg".into(),
                },
                RecentPhoto {
                    id: 11,
                    category: "Person".into(),
                    path: "photos/a.jpg".into(),
                },
            ],
            receipt_total: 1234.5,
        }
    }

    const EXPECTED: &str = r#"You are PersonaLens, a powerful AI assistant with FULL ACCESS to the user's photo library, people, receipts, vault, and messaging.
Be helpful, concise, and action-oriented. Always confirm before deleting.

=== USER CONTEXT ===
- Total Photos: 12
- Recognized People: 2
- Recent Uploads: Photo 12 (Receipt, path: photos/b.jpg), Photo 11 (Person, path: photos/a.jpg)
- Total Receipt Spending: ₹1234.50

=== AVAILABLE TOOLS ===
You have FULL CONTROL. Use these tools when the user asks you to act:

📷 PHOTOS:
1. list_photos(category=None) — list all photos; category: Person/Receipt/Document/Note/General
2. delete_photo(photo_id) — permanently delete a photo from disk and library
3. move_photo(photo_id, category) — move photo to a different category

👥 PEOPLE:
4. list_people() — list all named people
5. create_person(name) — create a new person profile
6. tag_person_in_photo(photo_id, person_id) — tag who is in a photo

🧾 RECEIPTS:
7. get_receipt_summary() — show spending totals and category breakdown
8. delete_receipt(receipt_id) — delete a receipt record

🔐 VAULT:
9. list_vault() — list all files in the secure vault

📨 MESSAGING:
10. send_email(to_email, subject, message) — send email from the user's configured mailbox
11. send_whatsapp(phone_number, message, image_path=None) — send WhatsApp text or image
    - image_path MUST be the exact file path like "uploads/photos/uuid.jpg" (NOT the photo ID)

=== RULES ===
- The account is fixed for this conversation; never ask for or pass a user id
- When you need IDs or Paths, call list_photos first
- For WhatsApp images: use the 'path' from list_photos or the recent uploads (e.g., 'photos/uuid.jpg') and prefix with 'uploads/'
- Before deleting anything, tell the user what you're about to delete and confirm
- To call a tool, respond with ONLY this JSON (nothing else):
{"tool": "tool_name", "args": {"arg": "value"}}
- For normal replies, use plain text only"#;

    #[test]
    fn prompt_matches_golden_text() {
        assert_eq!(build_system_prompt("PersonaLens", &sample_context()), EXPECTED);
    }

    #[test]
    fn assistant_name_is_substituted() {
        let prompt = build_system_prompt("Lens", &sample_context());
        assert!(prompt.starts_with("You are Lens, a powerful AI assistant"));
        assert_eq!(prompt.len(), EXPECTED.len() - "PersonaLens".len() + "Lens".len());
    }

    #[test]
    fn context_section_is_rendered() {
        let prompt = build_system_prompt("PersonaLens", &sample_context());
        assert!(prompt.starts_with("You are PersonaLens, a powerful AI assistant"));
        assert!(prompt.contains(
            "=== USER CONTEXT ===\n\
             - Total Photos: 12\n\
             - Recognized People: 2\n\
             - Recent Uploads: Photo 12 (Receipt, path: photos/b.jpg), Photo 11 (Person, path: photos/a.jpg)\n\
             - Total Receipt Spending: ₹1234.50\n"
        ));
    }

    #[test]
    fn empty_recent_uploads_render_as_none() {
        let mut ctx = sample_context();
        ctx.recent_photos.clear();
        let prompt = build_system_prompt("PersonaLens", &ctx);
        assert!(prompt.contains("- Recent Uploads: None\n"));
    }

    #[test]
    fn catalogue_is_numbered_under_group_headings() {
        let prompt = build_system_prompt("PersonaLens", &sample_context());
        assert!(prompt.contains(
            "\n📷 PHOTOS:\n1. list_photos(category=None) — list all photos; category: Person/Receipt/Document/Note/General\n"
        ));
        assert!(prompt.contains("\n🔐 VAULT:\n9. list_vault() — list all files in the secure vault\n"));
        assert!(prompt.contains(
            "11. send_whatsapp(phone_number, message, image_path=None) — send WhatsApp text or image\n    - image_path MUST"
        ));
        assert!(prompt.ends_with("- For normal replies, use plain text only"));
    }

    #[test]
    fn prompt_does_not_expose_account_id() {
        let prompt = build_system_prompt("PersonaLens", &sample_context());
        assert!(!prompt.contains("user_id"));
    }
}
