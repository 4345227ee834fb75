//! SQLite database wrapper with WAL mode and migration support.

use crate::state::schema;
use crate::types::*;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::{debug, info};

/// The PersonaLens library database.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).context("Failed to open SQLite database")?;

        // Enable WAL mode for better concurrency
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;

        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Run schema creation and migrations.
    fn migrate(&mut self) -> Result<()> {
        let version = self.schema_version();

        if version == 0 {
            info!("Creating database schema v{}", schema::SCHEMA_VERSION);
            self.conn
                .execute_batch(schema::CREATE_SCHEMA)
                .context("Failed to create schema")?;
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![schema::SCHEMA_VERSION],
            )?;
        } else {
            if version < 2 {
                info!("Migrating database v1 -> v2");
                self.conn.execute_batch(schema::MIGRATE_V1_TO_V2)?;
            }
            if version < schema::SCHEMA_VERSION {
                self.conn.execute(
                    "UPDATE schema_version SET version = ?1",
                    params![schema::SCHEMA_VERSION],
                )?;
            }
        }

        Ok(())
    }

    /// Get the current schema version (0 if uninitialized).
    pub fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    // -----------------------------------------------------------------------
    // Accounts
    // -----------------------------------------------------------------------

    /// Create an account and return its id.
    pub fn create_account(&self, email: &str, full_name: Option<&str>) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO accounts (email, full_name) VALUES (?1, ?2)",
                params![email, full_name],
            )
            .with_context(|| format!("Failed to create account {email}"))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Look up an account by id.
    pub fn get_account(&self, account_id: i64) -> Result<Option<Account>> {
        let account = self
            .conn
            .query_row(
                "SELECT id, email, full_name, created_at FROM accounts WHERE id = ?1",
                params![account_id],
                |row| {
                    Ok(Account {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        full_name: row.get(2)?,
                        created_at: row.get::<_, String>(3).map(|s| parse_timestamp(&s))?,
                    })
                },
            )
            .optional()?;
        Ok(account)
    }

    /// Store (or clear) the account's outgoing-mail credentials.
    /// Returns false when the account does not exist.
    pub fn set_smtp_credentials(
        &self,
        account_id: i64,
        smtp_email: Option<&str>,
        smtp_password: Option<&str>,
    ) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE accounts SET smtp_email = ?1, smtp_password = ?2 WHERE id = ?3",
            params![smtp_email, smtp_password, account_id],
        )?;
        Ok(updated > 0)
    }

    /// The account's stored SMTP credentials, if both halves are present.
    pub fn smtp_credentials(&self, account_id: i64) -> Result<Option<SmtpCredentials>> {
        let row: Option<(Option<String>, Option<String>)> = self
            .conn
            .query_row(
                "SELECT smtp_email, smtp_password FROM accounts WHERE id = ?1",
                params![account_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(match row {
            Some((Some(user), Some(password))) if !user.is_empty() && !password.is_empty() => {
                Some(SmtpCredentials { user, password })
            }
            _ => None,
        })
    }

    // -----------------------------------------------------------------------
    // Photos
    // -----------------------------------------------------------------------

    /// Insert a photo row and return its id.
    pub fn insert_photo(&self, account_id: i64, photo: &NewPhoto<'_>) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO photos (account_id, path, filename, category, is_sensitive)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                account_id,
                photo.path,
                photo.filename,
                photo.category.as_str(),
                photo.is_sensitive as i32,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn photo_count(&self, account_id: i64) -> Result<u64> {
        let count: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM photos WHERE account_id = ?1",
            params![account_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Most recently created photos, newest first.
    pub fn recent_photos(&self, account_id: i64, limit: u32) -> Result<Vec<Photo>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, filename, category, path, is_sensitive, created_at FROM photos
             WHERE account_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![account_id, limit], photo_from_row)?;
        collect(rows)
    }

    /// All photos for an account, optionally restricted to one category.
    pub fn list_photos(&self, account_id: i64, category: Option<&str>) -> Result<Vec<Photo>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, filename, category, path, is_sensitive, created_at FROM photos
             WHERE account_id = ?1 AND (?2 IS NULL OR category = ?2)
             ORDER BY id DESC",
        )?;
        let rows = stmt.query_map(params![account_id, category], photo_from_row)?;
        collect(rows)
    }

    /// A photo owned by the account.
    pub fn find_photo(&self, account_id: i64, photo_id: i64) -> Result<Option<Photo>> {
        let photo = self
            .conn
            .query_row(
                "SELECT id, filename, category, path, is_sensitive, created_at FROM photos
                 WHERE id = ?1 AND account_id = ?2",
                params![photo_id, account_id],
                photo_from_row,
            )
            .optional()?;
        Ok(photo)
    }

    /// A photo owned by the account, looked up by its stored relative path.
    /// Rows saved with a leading `uploads/` match too.
    pub fn find_photo_by_path(&self, account_id: i64, path: &str) -> Result<Option<Photo>> {
        let photo = self
            .conn
            .query_row(
                "SELECT id, filename, category, path, is_sensitive, created_at FROM photos
                 WHERE account_id = ?1 AND (path = ?2 OR path = 'uploads/' || ?2)
                 ORDER BY id DESC LIMIT 1",
                params![account_id, path],
                photo_from_row,
            )
            .optional()?;
        Ok(photo)
    }

    /// Delete a photo owned by the account. Faces and receipt rows cascade.
    pub fn delete_photo(&self, account_id: i64, photo_id: i64) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM photos WHERE id = ?1 AND account_id = ?2",
            params![photo_id, account_id],
        )?;
        Ok(deleted > 0)
    }

    /// Change a photo's category.
    pub fn set_photo_category(
        &self,
        account_id: i64,
        photo_id: i64,
        category: PhotoCategory,
    ) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE photos SET category = ?1 WHERE id = ?2 AND account_id = ?3",
            params![category.as_str(), photo_id, account_id],
        )?;
        Ok(updated > 0)
    }

    // -----------------------------------------------------------------------
    // People & faces
    // -----------------------------------------------------------------------

    pub fn person_count(&self, account_id: i64) -> Result<u64> {
        let count: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM people WHERE account_id = ?1",
            params![account_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// People with the number of faces tagged as them.
    pub fn list_people(&self, account_id: i64) -> Result<Vec<PersonSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.id, p.name, COUNT(f.id) FROM people p
             LEFT JOIN faces f ON f.person_id = p.id
             WHERE p.account_id = ?1
             GROUP BY p.id, p.name ORDER BY p.id",
        )?;
        let rows = stmt.query_map(params![account_id], |row| {
            Ok(PersonSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                tagged_photos: row.get(2)?,
            })
        })?;
        collect(rows)
    }

    pub fn create_person(&self, account_id: i64, name: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO people (account_id, name) VALUES (?1, ?2)",
            params![account_id, name],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Name of a person owned by the account.
    pub fn find_person_name(&self, account_id: i64, person_id: i64) -> Result<Option<String>> {
        let name = self
            .conn
            .query_row(
                "SELECT name FROM people WHERE id = ?1 AND account_id = ?2",
                params![person_id, account_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(name)
    }

    /// Delete a person owned by the account. Their faces become unidentified.
    pub fn delete_person(&self, account_id: i64, person_id: i64) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM people WHERE id = ?1 AND account_id = ?2",
            params![person_id, account_id],
        )?;
        Ok(deleted > 0)
    }

    /// Record a detected face, optionally already identified.
    pub fn insert_face(&self, photo_id: i64, person_id: Option<i64>) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO faces (photo_id, person_id) VALUES (?1, ?2)",
            params![photo_id, person_id],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Assign every face in the photo to the person, creating a placeholder
    /// face when none was detected. Runs as one transaction.
    ///
    /// Ownership of both rows must be checked by the caller.
    pub fn tag_faces(&self, photo_id: i64, person_id: i64) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut updated = tx.execute(
            "UPDATE faces SET person_id = ?1 WHERE photo_id = ?2",
            params![person_id, photo_id],
        )?;
        if updated == 0 {
            tx.execute(
                "INSERT INTO faces (photo_id, person_id) VALUES (?1, ?2)",
                params![photo_id, person_id],
            )?;
            updated = 1;
        }
        tx.commit()?;
        debug!("Tagged {} face(s) in photo {} as person {}", updated, photo_id, person_id);
        Ok(updated)
    }

    // -----------------------------------------------------------------------
    // Receipts
    // -----------------------------------------------------------------------

    pub fn insert_receipt(&self, photo_id: i64, receipt: &NewReceipt<'_>) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO receipts (photo_id, merchant, date, amount, tax, category)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                photo_id,
                receipt.merchant,
                receipt.date,
                receipt.amount,
                receipt.tax,
                receipt.category,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Receipts whose photo belongs to the account.
    pub fn list_receipts(&self, account_id: i64) -> Result<Vec<Receipt>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.merchant, r.amount, r.date, r.category FROM receipts r
             JOIN photos p ON p.id = r.photo_id
             WHERE p.account_id = ?1 ORDER BY r.id",
        )?;
        let rows = stmt.query_map(params![account_id], |row| {
            Ok(Receipt {
                id: row.get(0)?,
                merchant: row.get(1)?,
                amount: row.get(2)?,
                date: row.get(3)?,
                category: row.get(4)?,
            })
        })?;
        collect(rows)
    }

    /// Receipts with their photo path and upload time, newest receipt first.
    pub fn receipt_details(&self, account_id: i64) -> Result<Vec<ReceiptDetail>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.merchant, r.amount, r.tax, r.date, r.category, p.path, p.created_at
             FROM receipts r JOIN photos p ON p.id = r.photo_id
             WHERE p.account_id = ?1 ORDER BY r.id DESC",
        )?;
        let rows = stmt.query_map(params![account_id], |row| {
            Ok(ReceiptDetail {
                id: row.get(0)?,
                merchant: row.get(1)?,
                amount: row.get(2)?,
                tax: row.get(3)?,
                date: row.get(4)?,
                category: row.get(5)?,
                photo_path: row.get(6)?,
                uploaded_at: row.get(7)?,
            })
        })?;
        collect(rows)
    }

    pub fn receipt_count(&self, account_id: i64) -> Result<u64> {
        let count: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM receipts r JOIN photos p ON p.id = r.photo_id
             WHERE p.account_id = ?1",
            params![account_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Sum of receipt amounts (0 when there are none).
    pub fn receipt_total(&self, account_id: i64) -> Result<f64> {
        let total: Option<f64> = self.conn.query_row(
            "SELECT SUM(r.amount) FROM receipts r JOIN photos p ON p.id = r.photo_id
             WHERE p.account_id = ?1",
            params![account_id],
            |row| row.get(0),
        )?;
        Ok(total.unwrap_or(0.0))
    }

    /// Delete a receipt whose photo belongs to the account.
    pub fn delete_receipt(&self, account_id: i64, receipt_id: i64) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM receipts WHERE id = ?1
             AND photo_id IN (SELECT id FROM photos WHERE account_id = ?2)",
            params![receipt_id, account_id],
        )?;
        Ok(deleted > 0)
    }

    // -----------------------------------------------------------------------
    // Vault
    // -----------------------------------------------------------------------

    pub fn insert_vault_file(
        &self,
        account_id: i64,
        original_filename: &str,
        stored_path: &str,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO vault (account_id, original_filename, stored_path) VALUES (?1, ?2, ?3)",
            params![account_id, original_filename, stored_path],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_vault(&self, account_id: i64) -> Result<Vec<VaultEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, original_filename, created_at FROM vault
             WHERE account_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![account_id], |row| {
            Ok(VaultEntry {
                id: row.get(0)?,
                filename: row.get(1)?,
                added: row.get(2)?,
            })
        })?;
        collect(rows)
    }

    pub fn vault_count(&self, account_id: i64) -> Result<u64> {
        let count: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM vault WHERE account_id = ?1",
            params![account_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // -----------------------------------------------------------------------
    // Dashboard
    // -----------------------------------------------------------------------

    pub fn dashboard_stats(&self, account_id: i64) -> Result<DashboardStats> {
        Ok(DashboardStats::new(
            self.photo_count(account_id)?,
            self.vault_count(account_id)?,
            self.receipt_count(account_id)?,
            self.person_count(account_id)?,
        ))
    }
}

fn photo_from_row(row: &Row<'_>) -> rusqlite::Result<Photo> {
    Ok(Photo {
        id: row.get(0)?,
        filename: row.get(1)?,
        category: row.get(2)?,
        path: row.get(3)?,
        is_sensitive: row.get::<_, i32>(4)? != 0,
        created_at: row.get(5)?,
    })
}

fn collect<T>(rows: impl Iterator<Item = rusqlite::Result<T>>) -> Result<Vec<T>> {
    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

fn parse_timestamp(s: &str) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&chrono::Utc))
        .unwrap_or_else(|_| chrono::Utc::now())
}
