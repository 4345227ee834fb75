pub mod catalogue;
pub mod command;

pub use catalogue::{tool_definitions, ToolDefinition, ToolGroup, ToolSpec, CATALOGUE};
pub use command::{ToolArgsError, ToolCommand};

use crate::messaging::{attachment_key, normalize_phone, resolve_attachment, Messenger};
use crate::state::Database;
use crate::types::*;
use anyhow::Result;
use command::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const EMAIL_NOT_CONFIGURED: &str =
    "Email credentials not configured. Please add them in Settings → Email tab.";

// ---------------------------------------------------------------------------
// Tool execution engine
// ---------------------------------------------------------------------------

/// Handles shared by every tool handler.
#[derive(Clone)]
pub struct ToolContext {
    pub db: Arc<Mutex<Database>>,
    pub messenger: Arc<dyn Messenger>,
    /// Root that photo paths are relative to.
    pub uploads_dir: PathBuf,
    /// Sender used when the account has no stored SMTP credentials.
    pub default_sender: Option<SmtpCredentials>,
}

/// Execute a command on behalf of `account_id`. Never fails: handler errors
/// come back as `status: "error"` results.
pub async fn execute_tool(ctx: &ToolContext, account_id: i64, command: &ToolCommand) -> ToolResult {
    let result = match command {
        ToolCommand::ListPhotos(args) => list_photos(ctx, account_id, args).await,
        ToolCommand::DeletePhoto(args) => delete_photo(ctx, account_id, args).await,
        ToolCommand::MovePhoto(args) => move_photo(ctx, account_id, args).await,
        ToolCommand::ListPeople => list_people(ctx, account_id).await,
        ToolCommand::CreatePerson(args) => create_person(ctx, account_id, args).await,
        ToolCommand::TagPersonInPhoto(args) => tag_person_in_photo(ctx, account_id, args).await,
        ToolCommand::GetReceiptSummary => receipt_summary(ctx, account_id).await,
        ToolCommand::DeleteReceipt(args) => delete_receipt(ctx, account_id, args).await,
        ToolCommand::ListVault => list_vault(ctx, account_id).await,
        ToolCommand::SendEmail(args) => send_email(ctx, account_id, args).await,
        ToolCommand::SendWhatsApp(args) => send_whatsapp(ctx, account_id, args).await,
    };

    match result {
        Ok(result) => {
            if !result.is_success() {
                warn!("Tool {} rejected: {}", command.name(), result.message);
            }
            result
        }
        Err(e) => {
            warn!("Tool {} failed: {:#}", command.name(), e);
            ToolResult::error(format!("{e:#}"))
        }
    }
}

// -- Photos -------------------------------------------------------------------

async fn list_photos(ctx: &ToolContext, account_id: i64, args: &ListPhotosArgs) -> Result<ToolResult> {
    let category = args.category.as_deref().filter(|c| !c.is_empty());
    let photos = ctx.db.lock().await.list_photos(account_id, category)?;

    Ok(ToolResult::success(format!("Found {} photo(s)", photos.len()))
        .with("count", photos.len())
        .with("photos", &photos))
}

async fn delete_photo(ctx: &ToolContext, account_id: i64, args: &PhotoRef) -> Result<ToolResult> {
    let photo = {
        let db = ctx.db.lock().await;
        let Some(photo) = db.find_photo(account_id, args.photo_id)? else {
            return Ok(ToolResult::error(format!(
                "Photo {} not found for this user.",
                args.photo_id
            )));
        };
        db.delete_photo(account_id, photo.id)?;
        photo
    };

    remove_photo_file(&ctx.uploads_dir, &photo).await;
    info!("Deleted photo {} for account {}", photo.id, account_id);
    Ok(ToolResult::success(format!(
        "Photo #{} ('{}') deleted.",
        photo.id, photo.filename
    )))
}

/// Best-effort removal of a deleted photo's file. Paths that would leave the
/// uploads root are skipped.
pub async fn remove_photo_file(uploads_dir: &Path, photo: &Photo) {
    let Some(key) = attachment_key(&photo.path) else {
        warn!("Photo {} has unsafe path {}, file left alone", photo.id, photo.path);
        return;
    };
    let file = uploads_dir.join(key);
    match tokio::fs::remove_file(&file).await {
        Ok(()) => debug!("Removed {}", file.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Photo {} deleted but file {} remains: {}", photo.id, file.display(), e),
    }
}

async fn move_photo(ctx: &ToolContext, account_id: i64, args: &MovePhotoArgs) -> Result<ToolResult> {
    let Ok(category) = args.category.parse::<PhotoCategory>() else {
        let valid: Vec<&str> = PhotoCategory::ALL.iter().map(|c| c.as_str()).collect();
        return Ok(ToolResult::error(format!(
            "Invalid category. Use: {}",
            valid.join(", ")
        )));
    };

    let db = ctx.db.lock().await;
    let Some(photo) = db.find_photo(account_id, args.photo_id)? else {
        return Ok(ToolResult::error(format!("Photo {} not found.", args.photo_id)));
    };
    db.set_photo_category(account_id, photo.id, category)?;

    Ok(ToolResult::success(format!(
        "Photo #{} moved from '{}' to '{}'",
        photo.id, photo.category, category
    )))
}

// -- People -------------------------------------------------------------------

async fn list_people(ctx: &ToolContext, account_id: i64) -> Result<ToolResult> {
    let people = ctx.db.lock().await.list_people(account_id)?;

    Ok(ToolResult::success(format!("Found {} people", people.len()))
        .with("count", people.len())
        .with("people", &people))
}

async fn create_person(ctx: &ToolContext, account_id: i64, args: &CreatePersonArgs) -> Result<ToolResult> {
    let name = args.name.trim();
    if name.is_empty() {
        return Ok(ToolResult::error("Person name cannot be empty."));
    }

    let id = ctx.db.lock().await.create_person(account_id, name)?;
    Ok(ToolResult::success(format!("Person '{name}' created with ID {id}")).with("person_id", id))
}

async fn tag_person_in_photo(ctx: &ToolContext, account_id: i64, args: &TagPersonArgs) -> Result<ToolResult> {
    let db = ctx.db.lock().await;
    if db.find_photo(account_id, args.photo_id)?.is_none() {
        return Ok(ToolResult::error(format!("Photo {} not found.", args.photo_id)));
    }
    let Some(name) = db.find_person_name(account_id, args.person_id)? else {
        return Ok(ToolResult::error(format!("Person {} not found.", args.person_id)));
    };

    db.tag_faces(args.photo_id, args.person_id)?;
    Ok(ToolResult::success(format!(
        "Photo #{} tagged as '{}'",
        args.photo_id, name
    )))
}

// -- Receipts -----------------------------------------------------------------

async fn receipt_summary(ctx: &ToolContext, account_id: i64) -> Result<ToolResult> {
    let receipts = ctx.db.lock().await.list_receipts(account_id)?;

    let mut by_category: BTreeMap<String, f64> = BTreeMap::new();
    let mut total = 0.0;
    for r in &receipts {
        let amount = r.amount.unwrap_or(0.0);
        total += amount;
        let key = r.category.clone().unwrap_or_else(|| "General".into());
        let entry = by_category.entry(key).or_insert(0.0);
        *entry = round2(*entry + amount);
    }
    let total = round2(total);

    Ok(ToolResult::success(format!(
        "Total spending ₹{:.2} across {} receipt(s)",
        total,
        receipts.len()
    ))
    .with("total", total)
    .with("count", receipts.len())
    .with("by_category", &by_category)
    .with("receipts", &receipts))
}

async fn delete_receipt(ctx: &ToolContext, account_id: i64, args: &ReceiptRef) -> Result<ToolResult> {
    let deleted = ctx.db.lock().await.delete_receipt(account_id, args.receipt_id)?;
    if !deleted {
        return Ok(ToolResult::error(format!("Receipt {} not found.", args.receipt_id)));
    }
    Ok(ToolResult::success(format!("Receipt #{} deleted.", args.receipt_id)))
}

// -- Vault --------------------------------------------------------------------

async fn list_vault(ctx: &ToolContext, account_id: i64) -> Result<ToolResult> {
    let files = ctx.db.lock().await.list_vault(account_id)?;

    Ok(ToolResult::success(format!("Found {} vault file(s)", files.len()))
        .with("count", files.len())
        .with("files", &files))
}

// -- Messaging ----------------------------------------------------------------

async fn send_email(ctx: &ToolContext, account_id: i64, args: &SendEmailArgs) -> Result<ToolResult> {
    // Stored credentials win; the model never supplies its own.
    let stored = ctx.db.lock().await.smtp_credentials(account_id)?;
    let Some(credentials) = stored.or_else(|| ctx.default_sender.clone()) else {
        return Ok(ToolResult::error(EMAIL_NOT_CONFIGURED));
    };

    ctx.messenger
        .send_email(&credentials, &args.to_email, &args.subject, &args.message)
        .await?;
    Ok(ToolResult::success(format!("Email sent to {}", args.to_email)))
}

async fn send_whatsapp(
    ctx: &ToolContext,
    account_id: i64,
    args: &SendWhatsAppArgs,
) -> Result<ToolResult> {
    let phone = normalize_phone(&args.phone_number);

    let image = match args.image_path.as_deref().filter(|p| !p.trim().is_empty()) {
        Some(path) => match owned_attachment(ctx, account_id, path).await? {
            Some(resolved) => Some(resolved),
            None => return Ok(ToolResult::error(format!("Image file not found: {path}"))),
        },
        None => None,
    };

    ctx.messenger
        .send_whatsapp(&phone, &args.message, image.as_deref())
        .await?;

    let kind = if image.is_some() { "image" } else { "message" };
    Ok(ToolResult::success(format!("WhatsApp {kind} sent to {phone}")))
}

/// Resolve an image only when it is one of the account's own photos and the
/// file sits inside the uploads root.
async fn owned_attachment(ctx: &ToolContext, account_id: i64, path: &str) -> Result<Option<PathBuf>> {
    let Some(key) = attachment_key(path) else {
        debug!("Refusing attachment outside uploads root: {}", path);
        return Ok(None);
    };
    let owned = ctx.db.lock().await.find_photo_by_path(account_id, &key)?;
    if owned.is_none() {
        debug!("Account {} has no photo at {}", account_id, key);
        return Ok(None);
    }
    Ok(resolve_attachment(&ctx.uploads_dir, &key).ok())
}
