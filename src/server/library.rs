use super::dto::{
    CategoryUpdate, MessageResponse, NewPersonRequest, PersonResponse, PhotoMoved, PhotoQuery,
    ReceiptListing, ReceiptRow, TagPhotoRequest,
};
use super::error::ApiError;
use super::routes::{require_account, AccountId};
use super::state::AppState;
use crate::tools::remove_photo_file;
use crate::types::{round2, Photo, PhotoCategory, VaultEntry};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use tracing::info;

fn message(text: impl Into<String>) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.into(),
    })
}

// -- Photos -------------------------------------------------------------------

pub async fn list_photos(
    State(state): State<AppState>,
    account: AccountId,
    query: Result<Query<PhotoQuery>, QueryRejection>,
) -> Result<Json<Vec<Photo>>, ApiError> {
    let account_id = require_account(&state, account).await?;
    let Query(query) = query?;
    let category = query.category.as_deref().filter(|c| !c.is_empty());

    let mut photos = state.db.lock().await.list_photos(account_id, category)?;
    for photo in &mut photos {
        if let Some(stripped) = photo.path.strip_prefix("uploads/") {
            photo.path = stripped.to_string();
        }
    }
    Ok(Json(photos))
}

pub async fn move_photo(
    State(state): State<AppState>,
    account: AccountId,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CategoryUpdate>, JsonRejection>,
) -> Result<Json<PhotoMoved>, ApiError> {
    let account_id = require_account(&state, account).await?;
    let Path(photo_id) = path?;
    let Json(update) = payload?;

    let Ok(category) = update.category.parse::<PhotoCategory>() else {
        let valid: Vec<&str> = PhotoCategory::ALL.iter().map(|c| c.as_str()).collect();
        return Err(ApiError::BadRequest(format!(
            "Invalid category. Use one of: {}",
            valid.join(", ")
        )));
    };

    let db = state.db.lock().await;
    let Some(photo) = db.find_photo(account_id, photo_id)? else {
        return Err(ApiError::NotFound(format!("Photo {photo_id} not found")));
    };
    db.set_photo_category(account_id, photo.id, category)?;

    Ok(Json(PhotoMoved {
        message: format!("Photo moved from '{}' to '{}'", photo.category, category),
        photo_id: photo.id,
    }))
}

pub async fn delete_photo(
    State(state): State<AppState>,
    account: AccountId,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let account_id = require_account(&state, account).await?;
    let Path(photo_id) = path?;

    let photo = {
        let db = state.db.lock().await;
        let Some(photo) = db.find_photo(account_id, photo_id)? else {
            return Err(ApiError::NotFound(format!("Photo {photo_id} not found")));
        };
        db.delete_photo(account_id, photo.id)?;
        photo
    };
    remove_photo_file(&state.uploads_dir, &photo).await;

    info!(account_id, photo_id, "Photo deleted over REST");
    Ok(message(format!(
        "Photo #{} ('{}') deleted successfully",
        photo.id, photo.filename
    )))
}

// -- People -------------------------------------------------------------------

pub async fn list_people(
    State(state): State<AppState>,
    account: AccountId,
) -> Result<Json<Vec<PersonResponse>>, ApiError> {
    let account_id = require_account(&state, account).await?;
    let people = state.db.lock().await.list_people(account_id)?;
    Ok(Json(
        people
            .into_iter()
            .map(|p| PersonResponse {
                id: p.id,
                name: p.name,
                photo_count: p.tagged_photos,
            })
            .collect(),
    ))
}

pub async fn create_person(
    State(state): State<AppState>,
    account: AccountId,
    payload: Result<Json<NewPersonRequest>, JsonRejection>,
) -> Result<Json<PersonResponse>, ApiError> {
    let account_id = require_account(&state, account).await?;
    let Json(request) = payload?;
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name cannot be empty".to_string()));
    }

    let id = state.db.lock().await.create_person(account_id, name)?;
    Ok(Json(PersonResponse {
        id,
        name: name.to_string(),
        photo_count: 0,
    }))
}

pub async fn tag_photo(
    State(state): State<AppState>,
    account: AccountId,
    payload: Result<Json<TagPhotoRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let account_id = require_account(&state, account).await?;
    let Json(TagPhotoRequest { photo_id, person_id }) = payload?;

    let db = state.db.lock().await;
    if db.find_photo(account_id, photo_id)?.is_none() {
        return Err(ApiError::NotFound("Photo not found".to_string()));
    }
    let Some(name) = db.find_person_name(account_id, person_id)? else {
        return Err(ApiError::NotFound("Person not found".to_string()));
    };
    db.tag_faces(photo_id, person_id)?;

    Ok(message(format!("Photo #{photo_id} tagged as '{name}'")))
}

pub async fn delete_person(
    State(state): State<AppState>,
    account: AccountId,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let account_id = require_account(&state, account).await?;
    let Path(person_id) = path?;

    if !state.db.lock().await.delete_person(account_id, person_id)? {
        return Err(ApiError::NotFound("Person not found".to_string()));
    }
    Ok(message("Person deleted"))
}

// -- Receipts -----------------------------------------------------------------

pub async fn list_receipts(
    State(state): State<AppState>,
    account: AccountId,
) -> Result<Json<ReceiptListing>, ApiError> {
    let account_id = require_account(&state, account).await?;
    let details = state.db.lock().await.receipt_details(account_id)?;

    let month = Utc::now().format("%Y-%m").to_string();
    let total_all_time: f64 = details.iter().filter_map(|r| r.amount).sum();
    let total_this_month: f64 = details
        .iter()
        .filter(|r| r.uploaded_at.starts_with(&month))
        .filter_map(|r| r.amount)
        .sum();

    let receipts: Vec<ReceiptRow> = details
        .into_iter()
        .map(|r| ReceiptRow {
            id: r.id,
            merchant: r.merchant.unwrap_or_else(|| "Unknown".to_string()),
            amount: r.amount.unwrap_or(0.0),
            tax: r.tax.unwrap_or(0.0),
            date: r.date,
            category: r.category.unwrap_or_else(|| "General".to_string()),
            photo_path: r.photo_path,
        })
        .collect();

    Ok(Json(ReceiptListing {
        count: receipts.len(),
        receipts,
        total_all_time: round2(total_all_time),
        total_this_month: round2(total_this_month),
    }))
}

pub async fn delete_receipt(
    State(state): State<AppState>,
    account: AccountId,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let account_id = require_account(&state, account).await?;
    let Path(receipt_id) = path?;

    if !state.db.lock().await.delete_receipt(account_id, receipt_id)? {
        return Err(ApiError::NotFound("Receipt not found".to_string()));
    }
    Ok(message("Deleted"))
}

// -- Vault --------------------------------------------------------------------

pub async fn list_vault(
    State(state): State<AppState>,
    account: AccountId,
) -> Result<Json<Vec<VaultEntry>>, ApiError> {
    let account_id = require_account(&state, account).await?;
    let files = state.db.lock().await.list_vault(account_id)?;
    Ok(Json(files))
}
