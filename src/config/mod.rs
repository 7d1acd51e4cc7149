use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, str::FromStr, sync::Arc, time::Duration};
use tracing::{debug, warn};

use crate::crm::{LeadDirectory, MemoryDirectory};

/// Where lead data comes from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataMode {
    /// Built-in sample leads with simulated latency
    #[default]
    Mock,
    /// Leads read from a JSON file
    File,
}

impl FromStr for DataMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "file" => Ok(Self::File),
            other => Err(anyhow!("Unknown data mode '{}', expected 'mock' or 'file'", other)),
        }
    }
}

impl fmt::Display for DataMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mock => write!(f, "mock"),
            Self::File => write!(f, "file"),
        }
    }
}

/// Application configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Lead data source
    pub data_mode: DataMode,

    /// JSON file of leads, required in file mode
    pub leads_file: Option<PathBuf>,

    /// Directory for the log file
    pub data_dir: PathBuf,

    /// Whether the terminal reports mouse events
    pub mouse_enabled: bool,

    /// Size used for dialogs before their content reports one
    pub default_dialog_width: u16,
    pub default_dialog_height: u16,

    /// Offset between dialogs opened on top of each other
    pub cascade_step: u16,

    /// Interval between UI ticks
    pub tick_rate_ms: u64,

    /// Simulated round-trip of the mock directory
    pub mock_latency_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_mode: DataMode::Mock,
            leads_file: None,
            data_dir: dirs::data_local_dir()
                .map(|dir| dir.join("leadline"))
                .unwrap_or_else(|| PathBuf::from("./data")),
            mouse_enabled: true,
            default_dialog_width: 60,
            default_dialog_height: 16,
            cascade_step: 2,
            tick_rate_ms: 250,
            mock_latency_ms: 150,
        }
    }
}

impl Config {
    /// Initialize configuration from files and the environment
    pub async fn init() -> Result<Self> {
        debug!("Initializing configuration");

        let mut config = match Self::load_from_file(&Self::config_paths()).await? {
            Some(config) => config,
            None => Self::default(),
        };
        config.load_from_env();

        Ok(config)
    }

    /// Configuration files in priority order
    pub fn config_paths() -> Vec<PathBuf> {
        // 1. ./.leadline.json
        // 2. ./leadline.json
        // 3. $CONFIG_DIR/leadline/leadline.json
        let mut paths = vec![
            PathBuf::from("./.leadline.json"),
            PathBuf::from("./leadline.json"),
        ];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("leadline").join("leadline.json"));
        }
        paths
    }

    /// Load the first configuration file that exists
    pub async fn load_from_file(paths: &[PathBuf]) -> Result<Option<Self>> {
        for path in paths {
            if path.exists() {
                debug!("Loading configuration from: {}", path.display());
                let content = tokio::fs::read_to_string(path).await?;
                let config: Self = serde_json::from_str(&content)
                    .map_err(|e| anyhow!("Invalid configuration in {}: {}", path.display(), e))?;
                return Ok(Some(config));
            }
        }
        Ok(None)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(&mut self) {
        self.apply_env(|key| std::env::var(key).ok());
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(mode) = lookup("LEADLINE_DATA_MODE") {
            match mode.parse() {
                Ok(mode) => self.data_mode = mode,
                Err(e) => warn!("Ignoring LEADLINE_DATA_MODE: {}", e),
            }
        }

        if let Some(path) = lookup("LEADLINE_LEADS_FILE") {
            self.leads_file = Some(PathBuf::from(path));
        }

        if let Some(dir) = lookup("LEADLINE_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        if let Some(mouse) = lookup("LEADLINE_MOUSE") {
            self.mouse_enabled = matches!(mouse.to_lowercase().as_str(), "1" | "true" | "on" | "yes");
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.data_mode == DataMode::File {
            let path = self
                .leads_file
                .as_ref()
                .ok_or_else(|| anyhow!("File data mode needs a leads file. Set leads_file, LEADLINE_LEADS_FILE or pass --leads-file."))?;
            if !path.is_file() {
                return Err(anyhow!("Leads file {} does not exist", path.display()));
            }
        }

        if self.default_dialog_width < 20 || self.default_dialog_height < 6 {
            return Err(anyhow!("Default dialog size must be at least 20x6"));
        }

        if self.cascade_step > 16 {
            return Err(anyhow!("cascade_step must be between 0 and 16"));
        }

        if !(16..=5000).contains(&self.tick_rate_ms) {
            return Err(anyhow!("tick_rate_ms must be between 16 and 5000"));
        }

        Ok(())
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }

    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("leadline.log")
    }

    /// Build the lead directory selected by `data_mode`
    pub async fn directory(&self) -> Result<Arc<dyn LeadDirectory>> {
        match self.data_mode {
            DataMode::Mock => {
                debug!("Using mock lead directory");
                Ok(Arc::new(
                    MemoryDirectory::fixtures().with_latency(Duration::from_millis(self.mock_latency_ms)),
                ))
            }
            DataMode::File => {
                let path = self
                    .leads_file
                    .as_ref()
                    .ok_or_else(|| anyhow!("File data mode needs a leads file"))?;
                Ok(Arc::new(MemoryDirectory::from_file(path).await?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("leadline.json");
        std::fs::write(&path, r#"{ "cascade_step": 4, "mouse_enabled": false }"#).unwrap();

        let config = Config::load_from_file(&[dir.path().join("missing.json"), path])
            .await
            .unwrap()
            .unwrap();

        assert_eq!(config.cascade_step, 4);
        assert!(!config.mouse_enabled);
        assert_eq!(config.tick_rate_ms, Config::default().tick_rate_ms);
        assert_eq!(config.data_mode, DataMode::Mock);
    }

    #[tokio::test]
    async fn test_first_existing_file_wins() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join(".leadline.json");
        let second = dir.path().join("leadline.json");
        std::fs::write(&first, r#"{ "tick_rate_ms": 100 }"#).unwrap();
        std::fs::write(&second, r#"{ "tick_rate_ms": 900 }"#).unwrap();

        let config = Config::load_from_file(&[first, second]).await.unwrap().unwrap();
        assert_eq!(config.tick_rate_ms, 100);
    }

    #[tokio::test]
    async fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("leadline.json");
        std::fs::write(&path, "{ not json").unwrap();

        let error = Config::load_from_file(&[path]).await.unwrap_err();
        assert!(error.to_string().contains("Invalid configuration"));
    }

    #[tokio::test]
    async fn test_no_file_found() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from_file(&[dir.path().join("nope.json")]).await.unwrap();
        assert!(config.is_none());
    }

    #[test]
    fn test_env_overlay() {
        let vars = env(&[
            ("LEADLINE_DATA_MODE", "File"),
            ("LEADLINE_LEADS_FILE", "/tmp/leads.json"),
            ("LEADLINE_MOUSE", "off"),
        ]);
        let mut config = Config::default();
        config.apply_env(|key| vars.get(key).cloned());

        assert_eq!(config.data_mode, DataMode::File);
        assert_eq!(config.leads_file, Some(PathBuf::from("/tmp/leads.json")));
        assert!(!config.mouse_enabled);
    }

    #[test]
    fn test_bad_data_mode_is_ignored() {
        let vars = env(&[("LEADLINE_DATA_MODE", "postgres")]);
        let mut config = Config::default();
        config.apply_env(|key| vars.get(key).cloned());
        assert_eq!(config.data_mode, DataMode::Mock);
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());

        let file_mode = Config {
            data_mode: DataMode::File,
            ..Config::default()
        };
        assert!(file_mode.validate().is_err());

        let tiny = Config {
            default_dialog_width: 10,
            ..Config::default()
        };
        assert!(tiny.validate().is_err());

        let fast = Config {
            tick_rate_ms: 1,
            ..Config::default()
        };
        assert!(fast.validate().is_err());
    }

    #[tokio::test]
    async fn test_file_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("leads.json");
        std::fs::write(
            &path,
            r#"[{ "id": 7, "name": "Grace Hopper", "email": "grace@navy.test", "stage": "won" }]"#,
        )
        .unwrap();

        let config = Config {
            data_mode: DataMode::File,
            leads_file: Some(path),
            ..Config::default()
        };
        config.validate().unwrap();

        let leads = config.directory().await.unwrap().leads().await.unwrap();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].name, "Grace Hopper");
    }

    #[tokio::test]
    async fn test_mock_directory() {
        let config = Config {
            mock_latency_ms: 0,
            ..Config::default()
        };
        let leads = config.directory().await.unwrap().leads().await.unwrap();
        assert_eq!(leads.len(), 5);
    }
}
