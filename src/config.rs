//! Application configuration
//!
//! Loaded from a TOML file (default `~/.config/test-portal/config.toml`).
//! Every section and every key has a default, so an empty or missing file
//! yields a working development setup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::AccessTable;
use crate::shared::errors::InfraError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    pub admin: AdminConfig,
    pub email: EmailConfig,
    pub audit: AuditConfig,
    pub access: AccessTable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub api_host: String,
    pub api_port: u16,
    /// Seconds to wait for in-flight requests on shutdown
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_host: "0.0.0.0".to_string(),
            api_port: 8080,
            shutdown_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Full connection URL. When empty, a SQLite file next to the config
    /// directory is used.
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: String::new() }
    }
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> String {
        if !self.url.is_empty() {
            return self.url.clone();
        }
        let path = dirs_next::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("test-portal")
            .join("portal.db");
        format!("sqlite://{}?mode=rwc", path.display())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Emit JSON lines instead of the human-readable format
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub bcrypt_cost: u32,
    pub min_password_length: usize,
    pub reset_token_ttl_minutes: i64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_hours: 24,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            min_password_length: 8,
            reset_token_ttl_minutes: 60,
        }
    }
}

/// Superuser created on first start when the user table is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            email: "admin@localhost".to_string(),
            password: "admin123".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub enabled: bool,
    /// Receives registration and allocation notifications
    pub admin_email: String,
    pub notify_on_create: bool,
    pub notify_on_update: bool,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            admin_email: "admin@localhost".to_string(),
            notify_on_create: true,
            notify_on_update: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Keyset page size used by audit streams
    pub page_size: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { page_size: 100 }
    }
}

impl AppConfig {
    /// Read the config at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, InfraError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| InfraError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, InfraError> {
        let cfg: AppConfig =
            toml::from_str(raw).map_err(|e| InfraError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), InfraError> {
        if self.security.jwt_secret.is_empty() {
            return Err(InfraError::Config("security.jwt_secret must not be empty".into()));
        }
        if !(4..=31).contains(&self.security.bcrypt_cost) {
            return Err(InfraError::Config("security.bcrypt_cost must be within 4..=31".into()));
        }
        if self.security.jwt_expiration_hours <= 0 || self.security.reset_token_ttl_minutes <= 0 {
            return Err(InfraError::Config(
                "token lifetimes must be positive".into(),
            ));
        }
        if self.audit.page_size == 0 {
            return Err(InfraError::Config("audit.page_size must be positive".into()));
        }
        Ok(())
    }
}

pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("test-portal")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccessPolicy, Action, Role};

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = AppConfig::from_toml("").unwrap();
        assert_eq!(cfg.server.api_port, 8080);
        assert_eq!(cfg.security.min_password_length, 8);
        assert_eq!(cfg.audit.page_size, 100);
        assert!(!cfg.email.enabled);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = AppConfig::from_toml(
            r#"
            [server]
            api_port = 9090

            [email]
            enabled = true
            admin_email = "qa-leads@example.com"

            [access.requirements]
            view_audit = ["manager"]
            "#,
        )
        .unwrap();

        assert_eq!(cfg.server.api_port, 9090);
        assert_eq!(cfg.server.api_host, "0.0.0.0");
        assert_eq!(cfg.email.admin_email, "qa-leads@example.com");
        assert!(cfg.email.notify_on_create);

        let policy = AccessPolicy::from_table(&cfg.access);
        assert!(policy.permits(Role::Manager, Action::ViewAudit));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(AppConfig::from_toml("[security]\nbcrypt_cost = 2").is_err());
        assert!(AppConfig::from_toml("[audit]\npage_size = 0").is_err());
        assert!(AppConfig::from_toml("[server\n").is_err());
    }

    #[test]
    fn explicit_database_url_wins() {
        let db = DatabaseConfig {
            url: "sqlite::memory:".into(),
        };
        assert_eq!(db.connection_url(), "sqlite::memory:");
        assert!(DatabaseConfig::default().connection_url().starts_with("sqlite://"));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let cfg = AppConfig::load(Path::new("/nonexistent/test-portal.toml")).unwrap();
        assert_eq!(cfg.admin.username, "admin");
    }

    #[test]
    fn unreadable_path_is_a_config_error() {
        let err = AppConfig::load(&std::env::temp_dir()).unwrap_err();
        assert!(matches!(err, InfraError::Config(msg) if msg.starts_with("cannot read")));
    }
}
