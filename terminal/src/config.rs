use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shared::ClientId;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Digits of random suffix in a generated client id
const ID_SUFFIX_SPACE: u64 = 36u64.pow(11);

/// Persistent terminal client state
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClientConfig {
    /// Identifier the server keys this client's history by
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,

    /// When `client_id` was generated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Last server URL given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
}

impl ClientConfig {
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = directories::ProjectDirs::from("com", "fitbot", "fitbot-chat")
            .context("Failed to determine config directory")?
            .config_dir()
            .to_path_buf();

        Ok(config_dir.join("config.json"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).context("Failed to read config file")?;

        let config: Self =
            serde_json::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Write to a temp file next to `path`, then rename over it
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let temp_path = path.with_extension("tmp");
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&temp_path, &contents).context("Failed to write temp config file")?;

        fs::rename(&temp_path, path).context("Failed to rename config file")?;

        Ok(())
    }

    /// Return the stored client id, generating one if none is stored.
    /// The flag is true when a new id was generated and needs saving.
    pub fn ensure_client_id(&mut self) -> (ClientId, bool) {
        if let Some(id) = self.client_id.as_ref().filter(|id| !id.as_str().is_empty()) {
            return (id.clone(), false);
        }

        let now = chrono::Utc::now();
        let entropy = (Uuid::new_v4().as_u128() as u64) % ID_SUFFIX_SPACE;
        let id = ClientId::generate(now.timestamp_millis().max(0) as u64, entropy);

        self.client_id = Some(id.clone());
        self.created_at = Some(now.to_rfc3339());
        (id, true)
    }

    /// Drop the stored id so the next run starts a fresh conversation.
    pub fn forget_client_id(&mut self) -> Option<ClientId> {
        self.created_at = None;
        self.client_id.take()
    }

    /// Remember `url` as the default server. Returns true if it changed.
    pub fn remember_server_url(&mut self, url: &str) -> bool {
        if self.server_url.as_deref() == Some(url) {
            return false;
        }
        self.server_url = Some(url.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_file(dir: &TempDir) -> PathBuf {
        dir.path().join("nested").join("config.json")
    }

    #[test]
    fn missing_file_loads_default() {
        let dir = TempDir::new().unwrap();
        let config = ClientConfig::load_from(&config_file(&dir)).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn generated_id_is_stable_once_saved() {
        let dir = TempDir::new().unwrap();
        let path = config_file(&dir);

        let mut config = ClientConfig::default();
        let (id, created) = config.ensure_client_id();
        assert!(created);
        assert!(id.is_accepted_by_server());
        assert!(config.created_at.is_some());
        config.save_to(&path).unwrap();

        let mut reloaded = ClientConfig::load_from(&path).unwrap();
        let (again, created) = reloaded.ensure_client_id();
        assert!(!created);
        assert_eq!(again, id);
    }

    #[test]
    fn stored_id_is_used_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = config_file(&dir);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"client_id":"Not Valid!"}"#).unwrap();

        let mut config = ClientConfig::load_from(&path).unwrap();
        let (id, created) = config.ensure_client_id();
        assert!(!created);
        assert_eq!(id.as_str(), "Not Valid!");
        assert!(!id.is_accepted_by_server());
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = config_file(&dir);

        let mut config = ClientConfig::default();
        config.remember_server_url("https://fitbot.example");
        config.save_to(&path).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("https://fitbot.example"));
        assert!(!contents.contains("client_id"));
    }

    #[test]
    fn forget_clears_id() {
        let mut config = ClientConfig::default();
        let (id, _) = config.ensure_client_id();
        assert_eq!(config.forget_client_id(), Some(id));
        assert_eq!(config.client_id, None);
        assert_eq!(config.created_at, None);
        assert_eq!(config.forget_client_id(), None);
    }

    #[test]
    fn remember_server_url_reports_changes() {
        let mut config = ClientConfig::default();
        assert!(config.remember_server_url("http://localhost:8000"));
        assert!(!config.remember_server_url("http://localhost:8000"));
        assert!(config.remember_server_url("http://localhost:9000"));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = config_file(&dir);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();
        assert!(ClientConfig::load_from(&path).is_err());
    }
}
