//! Configuration schema for personalens.toml.

use crate::types::SmtpCredentials;
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaLensConfig {
    /// Human-readable assistant name, used in the system prompt.
    pub name: String,

    /// Groq API base URL (OpenAI-compatible endpoints live under `/openai/v1`).
    pub groq_api_url: String,

    /// Groq API key. Falls back to `GROQ_API_KEY` when empty.
    pub groq_api_key: String,

    /// Chat-completion model for the assistant.
    pub chat_model: String,

    /// Maximum tokens per completion.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f64,

    /// Path to SQLite database.
    pub db_path: String,

    /// Root directory photo paths are relative to.
    pub uploads_dir: String,

    /// Address the HTTP server binds to.
    pub bind_addr: String,

    /// Origins allowed by CORS.
    pub allowed_origins: Vec<String>,

    /// Messaging relay URL for outbound email and WhatsApp.
    pub relay_url: String,

    /// Fallback sender when an account has no SMTP credentials (`EMAIL_USER`).
    pub default_email_user: String,

    /// Fallback sender password (`EMAIL_PASS`).
    pub default_email_pass: String,

    /// Log level (debug, info, warn, error).
    pub log_level: String,
}

impl Default for PersonaLensConfig {
    fn default() -> Self {
        Self {
            name: "PersonaLens".into(),
            groq_api_url: "https://api.groq.com".into(),
            groq_api_key: String::new(),
            chat_model: "llama-3.3-70b-versatile".into(),
            max_tokens: 1024,
            temperature: 0.7,
            db_path: "~/.personalens/personalens.db".into(),
            uploads_dir: "~/.personalens/uploads".into(),
            bind_addr: "0.0.0.0:8000".into(),
            allowed_origins: vec![
                "http://localhost:3000".into(),
                "http://127.0.0.1:3000".into(),
            ],
            relay_url: String::new(),
            default_email_user: String::new(),
            default_email_pass: String::new(),
            log_level: "info".into(),
        }
    }
}

impl PersonaLensConfig {
    /// Resolve a path that may contain `~` to an absolute path.
    pub fn resolve_path(&self, path: &str) -> String {
        shellexpand::tilde(path).into_owned()
    }

    /// Resolved database path.
    pub fn resolved_db_path(&self) -> String {
        self.resolve_path(&self.db_path)
    }

    /// Resolved uploads root.
    pub fn resolved_uploads_dir(&self) -> String {
        self.resolve_path(&self.uploads_dir)
    }

    /// Configured fallback sender, if both halves are set.
    pub fn default_sender(&self) -> Option<SmtpCredentials> {
        if self.default_email_user.is_empty() || self.default_email_pass.is_empty() {
            return None;
        }
        Some(SmtpCredentials {
            user: self.default_email_user.clone(),
            password: self.default_email_pass.clone(),
        })
    }

    /// Fill empty credential fields from the given environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        fill(&mut self.groq_api_key, lookup("GROQ_API_KEY"));
        fill(&mut self.default_email_user, lookup("EMAIL_USER"));
        fill(&mut self.default_email_pass, lookup("EMAIL_PASS"));
    }
}

fn fill(field: &mut String, value: Option<String>) {
    if field.is_empty() {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            *field = v;
        }
    }
}
