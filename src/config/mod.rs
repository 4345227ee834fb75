pub mod schema;

pub use schema::PersonaLensConfig;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Default home directory (~/.personalens).
pub fn default_home_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".personalens"))
        .unwrap_or_else(|| PathBuf::from(".personalens"))
}

/// Load config from the given path, or return defaults. Empty credentials
/// are filled from the process environment.
pub fn load_config(path: &Path) -> Result<PersonaLensConfig> {
    let mut config = if path.exists() {
        let contents =
            std::fs::read_to_string(path).context("Failed to read personalens config file")?;
        toml::from_str(&contents).context("Failed to parse personalens config (TOML)")?
    } else {
        PersonaLensConfig::default()
    };
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

/// Save config to the given path (TOML format).
pub fn save_config(config: &PersonaLensConfig, path: &Path) -> Result<()> {
    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents).context("Failed to write config file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.chat_model, "llama-3.3-70b-versatile");
        assert_eq!(config.bind_addr, "0.0.0.0:8000");
    }

    #[test]
    fn save_then_load_keeps_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("personalens.toml");
        let mut config = PersonaLensConfig::default();
        config.relay_url = "http://relay.local".into();
        config.max_tokens = 256;
        save_config(&config, &path).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.relay_url, "http://relay.local");
        assert_eq!(loaded.max_tokens, 256);
    }

    #[test]
    fn partial_file_uses_field_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("personalens.toml");
        std::fs::write(&path, "name = \"Lens\"\n").unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.name, "Lens");
        assert_eq!(loaded.temperature, 0.7);
    }

    #[test]
    fn env_only_fills_empty_fields() {
        let mut config = PersonaLensConfig::default();
        config.default_email_user = "me@example.com".into();
        config.apply_env(|key| match key {
            "GROQ_API_KEY" => Some("gsk_env".into()),
            "EMAIL_USER" => Some("env@example.com".into()),
            _ => None,
        });
        assert_eq!(config.groq_api_key, "gsk_env");
        assert_eq!(config.default_email_user, "me@example.com");
        assert!(config.default_email_pass.is_empty());
    }

    #[test]
    fn default_sender_needs_both_halves() {
        let mut config = PersonaLensConfig::default();
        config.default_email_user = "me@example.com".into();
        assert!(config.default_sender().is_none());
        config.default_email_pass = "app-pass".into();
        assert_eq!(config.default_sender().unwrap().user, "me@example.com");
    }

    #[test]
    fn default_home_is_dot_personalens() {
        assert!(default_home_dir().ends_with(".personalens"));
    }
}
