//! Live account context injected into the system prompt.

use crate::state::Database;
use anyhow::{Context, Result};
use tracing::debug;

/// How many recent uploads the prompt mentions.
pub const RECENT_PHOTO_LIMIT: u32 = 3;

/// Snapshot of an account taken at the start of a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountContext {
    pub account_id: i64,
    pub photo_count: u64,
    pub person_count: u64,
    pub recent_photos: Vec<RecentPhoto>,
    pub receipt_total: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecentPhoto {
    pub id: i64,
    pub category: String,
    pub path: String,
}

/// Query storage for the account's counts, latest uploads and receipt spend.
///
/// Any storage failure aborts the turn; no partial context is returned.
pub fn build_account_context(db: &Database, account_id: i64) -> Result<AccountContext> {
    let photo_count = db
        .photo_count(account_id)
        .context("failed to count photos")?;
    let person_count = db
        .person_count(account_id)
        .context("failed to count people")?;
    let recent_photos = db
        .recent_photos(account_id, RECENT_PHOTO_LIMIT)
        .context("failed to load recent photos")?
        .into_iter()
        .map(|p| RecentPhoto {
            id: p.id,
            category: p.category,
            path: p.path,
        })
        .collect();
    let receipt_total = db
        .receipt_total(account_id)
        .context("failed to total receipts")?;

    debug!(
        "Context for account {}: {} photos, {} people, ₹{:.2} spent",
        account_id, photo_count, person_count, receipt_total
    );

    Ok(AccountContext {
        account_id,
        photo_count,
        person_count,
        recent_photos,
        receipt_total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;

    #[test]
    fn context_reflects_only_the_bound_account() {
        let db = Database::open_memory().unwrap();
        let me = db.create_account("me@example.com", None).unwrap();
        let other = db.create_account("other@example.com", None).unwrap();

        let mut ids = Vec::new();
        for (i, category) in PhotoCategory::ALL.iter().enumerate() {
            let path = format!("photos/{i}.jpg");
            ids.push(
                db.insert_photo(
                    me,
                    &NewPhoto {
                        path: &path,
                        filename: "x.jpg",
                        category: *category,
                        is_sensitive: false,
                    },
                )
                .unwrap(),
            );
        }
        let receipt_photo = ids[1];
        db.insert_receipt(receipt_photo, &NewReceipt { amount: Some(42.5), ..Default::default() })
            .unwrap();
        db.create_person(me, "Ann").unwrap();
        db.insert_photo(
            other,
            &NewPhoto {
                path: "photos/other.jpg",
                filename: "o.jpg",
                category: PhotoCategory::General,
                is_sensitive: false,
            },
        )
        .unwrap();

        let ctx = build_account_context(&db, me).unwrap();
        assert_eq!(ctx.photo_count, 5);
        assert_eq!(ctx.person_count, 1);
        assert_eq!(ctx.receipt_total, 42.5);
        assert_eq!(ctx.recent_photos.len(), 3);
        assert_eq!(ctx.recent_photos[0].id, ids[4]);
        assert!(ctx.recent_photos.iter().all(|p| p.path != "photos/other.jpg"));
    }

    #[test]
    fn empty_account_has_zeroed_context() {
        let db = Database::open_memory().unwrap();
        let me = db.create_account("me@example.com", None).unwrap();
        let ctx = build_account_context(&db, me).unwrap();
        assert_eq!(ctx.photo_count, 0);
        assert_eq!(ctx.receipt_total, 0.0);
        assert!(ctx.recent_photos.is_empty());
    }
}
