use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BookstacksError, Result};

/// Root application configuration, loaded from `~/.config/bookstacks/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub core: CoreConfig,
    pub covers: CoversConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub library_path: String,
    /// Name of the environment variable holding the shared admin password.
    pub admin_password_env: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
}

/// Endpoints and limits used when resolving cover images.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoversConfig {
    pub catalog_base_url: String,
    pub covers_base_url: String,
    pub secondary_base_url: String,
    pub placeholder_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for CoreConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("bookstacks");

        Self {
            library_path: data_dir.to_string_lossy().to_string(),
            admin_password_env: "BOOKSTACKS_ADMIN_PASSWORD".to_string(),
            admin_password: None,
        }
    }
}

impl Default for CoversConfig {
    fn default() -> Self {
        Self {
            catalog_base_url: "https://openlibrary.org".to_string(),
            covers_base_url: "https://covers.openlibrary.org".to_string(),
            secondary_base_url: "https://www.googleapis.com/books/v1".to_string(),
            placeholder_url: "https://via.placeholder.com/256x384.png?text=No+Cover".to_string(),
            timeout_secs: 10,
            user_agent: concat!("bookstacks/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/bookstacks/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("BOOKSTACKS_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("bookstacks")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn set_library_path(&mut self, path: PathBuf) {
        self.core.library_path = path.to_string_lossy().to_string();
    }

    pub fn library_path(&self) -> PathBuf {
        PathBuf::from(&self.core.library_path)
    }

    /// Path to the SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        self.library_path().join("bookstacks.db")
    }

    /// The shared admin password: the configured env var wins over the file value.
    pub fn admin_password(&self) -> Option<String> {
        std::env::var(&self.core.admin_password_env)
            .ok()
            .filter(|p| !p.is_empty())
            .or_else(|| self.core.admin_password.clone().filter(|p| !p.is_empty()))
    }

    /// Gate for mutating operations. Without a configured password nothing is allowed.
    pub fn authorize(&self, supplied: Option<&str>) -> Result<()> {
        match (self.admin_password(), supplied) {
            (Some(expected), Some(given)) if expected == given => Ok(()),
            (None, _) => {
                tracing::warn!(
                    env = %self.core.admin_password_env,
                    "no admin password configured, refusing mutation"
                );
                Err(BookstacksError::Unauthorized)
            }
            _ => Err(BookstacksError::Unauthorized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_with_password(password: Option<&str>) -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.core.admin_password_env = "BOOKSTACKS_TEST_UNSET_PASSWORD_VAR".to_string();
        cfg.core.admin_password = password.map(str::to_string);
        cfg
    }

    #[test]
    fn test_default_config_is_valid() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.covers.timeout_secs, 10);
        assert_eq!(cfg.covers.catalog_base_url, "https://openlibrary.org");
        assert!(!cfg.core.library_path.is_empty());
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = AppConfig::default();
        cfg.covers.placeholder_url = "https://example.com/none.png".to_string();
        cfg.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.covers.placeholder_url, "https://example.com/none.png");
        assert_eq!(loaded.core.admin_password_env, cfg.core.admin_password_env);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[covers]\ntimeout_secs = 3\n").unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.covers.timeout_secs, 3);
        assert_eq!(loaded.covers.secondary_base_url, "https://www.googleapis.com/books/v1");
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let missing = Path::new("/tmp/nonexistent_bookstacks_config.toml");
        let cfg = AppConfig::load_from(missing).unwrap();
        assert_eq!(cfg.covers.timeout_secs, 10);
    }

    #[test]
    fn test_database_path_under_library() {
        let mut cfg = AppConfig::default();
        cfg.set_library_path(PathBuf::from("/srv/books"));
        assert_eq!(cfg.database_path(), PathBuf::from("/srv/books/bookstacks.db"));
    }

    #[test]
    fn test_authorize_checks_password() {
        let cfg = config_with_password(Some("JulietA"));
        assert!(cfg.authorize(Some("JulietA")).is_ok());
        assert!(matches!(cfg.authorize(Some("wrong")), Err(BookstacksError::Unauthorized)));
        assert!(matches!(cfg.authorize(None), Err(BookstacksError::Unauthorized)));
    }

    #[test]
    fn test_authorize_without_configured_password_refuses() {
        let cfg = config_with_password(None);
        assert!(matches!(cfg.authorize(Some("")), Err(BookstacksError::Unauthorized)));
    }
}
