use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::output::DEFAULT_SCROLLBACK_LIMIT;
use crate::session::Theme;

/// Environment variable that overrides `general.log_level`.
pub const LOG_ENV: &str = "OMEGA_LOG";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OmegaConfig {
    /// General settings
    pub general: GeneralConfig,

    /// Terminal behaviour and appearance
    pub terminal: TerminalConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Maximum number of commands kept in history
    pub history_limit: usize,

    /// Maximum number of output lines kept in scrollback
    pub scrollback_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Prompt shown before echoed commands
    pub prompt: String,

    /// Theme at startup
    pub theme: Theme,

    /// Sound effects at startup
    pub sound: bool,

    /// Show the wallet menu and wait for a choice when the terminal starts
    pub wallet_prompt_on_start: bool,
}

impl OmegaConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Get the default configuration path
    pub fn default_path() -> Result<PathBuf> {
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
        Ok(home.join(".omega").join("config.toml"))
    }

    /// Merge with command-line overrides
    pub fn merge_overrides(&mut self, overrides: Vec<(String, String)>) -> Result<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "log_level" => self.general.log_level = value,
                "history_limit" => self.general.history_limit = value.parse()?,
                "scrollback_limit" => self.general.scrollback_limit = value.parse()?,
                "prompt" => self.terminal.prompt = value,
                "theme" => self.terminal.theme = value.parse()?,
                "sound" => self.terminal.sound = value.parse()?,
                "wallet_prompt" => self.terminal.wallet_prompt_on_start = value.parse()?,
                _ => bail!("Unknown config key: {}", key),
            }
        }
        Ok(())
    }

    /// Log filter from `OMEGA_LOG` when set, otherwise `general.log_level`.
    pub fn log_filter(&self) -> EnvFilter {
        EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(&self.general.log_level))
    }
}

impl Default for OmegaConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig {
                log_level: "warn".to_string(),
                history_limit: DEFAULT_HISTORY_LIMIT,
                scrollback_limit: DEFAULT_SCROLLBACK_LIMIT,
            },
            terminal: TerminalConfig {
                prompt: "root@omega-miner:~$".to_string(),
                theme: Theme::Dark,
                sound: true,
                wallet_prompt_on_start: true,
            },
        }
    }
}

/// Parses `key=value` override arguments.
pub fn parse_override(arg: &str) -> Result<(String, String)> {
    match arg.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => bail!("Expected key=value, got: {}", arg),
    }
}

/// Load or create configuration
pub fn load_or_create_config(path: Option<&Path>) -> Result<OmegaConfig> {
    let config_path = if let Some(p) = path {
        p.to_path_buf()
    } else {
        OmegaConfig::default_path()?
    };

    if config_path.exists() {
        OmegaConfig::load(&config_path)
    } else {
        let config = OmegaConfig::default();
        config.save(&config_path)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = OmegaConfig::default();
        assert_eq!(config.general.history_limit, 100);
        assert_eq!(config.general.scrollback_limit, 1000);
        assert_eq!(config.terminal.theme, Theme::Dark);
        assert!(config.terminal.wallet_prompt_on_start);
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut config = OmegaConfig::default();
        config.terminal.theme = Theme::Matrix;
        config.save(&config_path).unwrap();

        let loaded = OmegaConfig::load(&config_path).unwrap();
        assert_eq!(loaded.terminal, config.terminal);
        assert_eq!(loaded.general.history_limit, config.general.history_limit);
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let config = load_or_create_config(Some(&config_path)).unwrap();
        assert!(config_path.exists());
        assert_eq!(config.terminal, OmegaConfig::default().terminal);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(&config_path, "general = 42").unwrap();
        assert!(OmegaConfig::load(&config_path).is_err());
    }

    #[test]
    fn test_merge_overrides() {
        let mut config = OmegaConfig::default();

        let overrides = vec![
            ("theme".to_string(), "retro".to_string()),
            ("sound".to_string(), "false".to_string()),
            ("history_limit".to_string(), "5".to_string()),
        ];

        config.merge_overrides(overrides).unwrap();
        assert_eq!(config.terminal.theme, Theme::Retro);
        assert!(!config.terminal.sound);
        assert_eq!(config.general.history_limit, 5);

        let bad = vec![("colour".to_string(), "red".to_string())];
        assert!(config.merge_overrides(bad).is_err());
    }

    #[test]
    fn test_parse_override() {
        assert_eq!(
            parse_override("theme=matrix").unwrap(),
            ("theme".to_string(), "matrix".to_string())
        );
        assert!(parse_override("theme").is_err());
        assert!(parse_override("=x").is_err());
    }

    // The only test touching the environment, so the two phases cannot race.
    #[test]
    fn test_log_filter_prefers_env_even_on_first_run() {
        use tracing_subscriber::filter::LevelFilter;

        let temp_dir = TempDir::new().unwrap();

        std::env::remove_var(LOG_ENV);
        let mut config = load_or_create_config(Some(&temp_dir.path().join("a.toml"))).unwrap();
        config.general.log_level = "error".to_string();
        assert_eq!(config.log_filter().max_level_hint(), Some(LevelFilter::ERROR));

        std::env::set_var(LOG_ENV, "debug");
        let fresh = temp_dir.path().join("b.toml");
        assert!(!fresh.exists());
        let config = load_or_create_config(Some(&fresh)).unwrap();
        let filter = config.log_filter();
        std::env::remove_var(LOG_ENV);

        assert_eq!(config.general.log_level, "warn");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }
}
