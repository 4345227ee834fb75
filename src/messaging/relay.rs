//! Outbound email and WhatsApp delivery via the messaging relay.

use crate::types::SmtpCredentials;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Something that can deliver messages on an account's behalf.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_email(
        &self,
        credentials: &SmtpCredentials,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<()>;

    async fn send_whatsapp(&self, phone: &str, message: &str, image: Option<&Path>) -> Result<()>;
}

/// HTTP relay client.
#[derive(Debug, Clone)]
pub struct RelayClient {
    relay_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct EmailRequest<'a> {
    smtp_user: &'a str,
    smtp_pass: &'a str,
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct WhatsAppRequest<'a> {
    phone: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_path: Option<String>,
}

impl RelayClient {
    pub fn new(relay_url: &str) -> Self {
        Self {
            relay_url: relay_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    async fn post<T: Serialize + ?Sized>(&self, route: &str, payload: &T) -> Result<()> {
        if self.relay_url.is_empty() {
            bail!("Messaging relay is not configured");
        }

        let resp = self
            .http
            .post(format!("{}{}", self.relay_url, route))
            .json(payload)
            .send()
            .await
            .context("Failed to reach messaging relay")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Relay rejected message ({}): {}", status, body);
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for RelayClient {
    async fn send_email(
        &self,
        credentials: &SmtpCredentials,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<()> {
        self.post(
            "/v1/email",
            &EmailRequest {
                smtp_user: &credentials.user,
                smtp_pass: &credentials.password,
                to,
                subject,
                body,
            },
        )
        .await?;
        info!("Email relayed to {}", to);
        Ok(())
    }

    async fn send_whatsapp(&self, phone: &str, message: &str, image: Option<&Path>) -> Result<()> {
        self.post(
            "/v1/whatsapp",
            &WhatsAppRequest {
                phone,
                message,
                image_path: image.map(|p| p.to_string_lossy().replace('\\', "/")),
            },
        )
        .await?;
        info!("WhatsApp message relayed to {}", phone);
        Ok(())
    }
}

/// Strip spaces and dashes and ensure a leading `+`.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect();
    if digits.starts_with('+') {
        digits
    } else {
        format!("+{digits}")
    }
}

/// Reduce a model-supplied image path to its key under the uploads root.
/// A leading `uploads/` is dropped. Absolute paths and `..` segments yield `None`.
pub fn attachment_key(path: &str) -> Option<String> {
    let normalized = path.trim().replace('\\', "/");
    let relative = normalized.strip_prefix("uploads/").unwrap_or(&normalized);
    if relative.is_empty() || Path::new(relative).is_absolute() || relative.starts_with('/') {
        return None;
    }
    let mut parts = Vec::new();
    for part in relative.split('/') {
        match part {
            "" | "." => continue,
            ".." => return None,
            p if p.contains(':') => return None,
            p => parts.push(p),
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Locate an attachment under the uploads root. The resolved file must stay
/// inside the root after symlinks are followed.
pub fn resolve_attachment(uploads_dir: &Path, path: &str) -> Result<PathBuf> {
    let not_found = || anyhow::anyhow!("Image file not found: {}", path);
    let key = attachment_key(path).ok_or_else(not_found)?;

    let root = uploads_dir.canonicalize().map_err(|_| not_found())?;
    let resolved = root.join(&key).canonicalize().map_err(|_| not_found())?;
    if !resolved.starts_with(&root) || !resolved.is_file() {
        return Err(not_found());
    }
    Ok(resolved)
}
