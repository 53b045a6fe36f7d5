use super::types::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::BidError;
use crate::rules::RuleBook;
use crate::store::SettingsStore;

pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    pub fn new() -> Self {
        let config_path = Self::get_config_path();
        Self { config_path }
    }

    pub fn at(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    fn get_config_path() -> PathBuf {
        // Config lives next to the executable so several instances can run side by side
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf))
            .or_else(|| dirs::config_dir().map(|d| d.join("moonbid")))
            .unwrap_or_else(|| PathBuf::from("."));

        exe_dir.join("config.toml")
    }

    /// Directory relative paths in the config are resolved against
    pub fn base_dir(&self) -> PathBuf {
        self.config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            info!("Config file not found, creating default config at {:?}", self.config_path);
            let config = Config::default();
            self.save(&config)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(&self.config_path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        info!("Loaded configuration from {:?}", self.config_path);
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(config)
            .context("Failed to serialize config")?;

        fs::write(&self.config_path, toml_string)
            .context("Failed to write config file")?;

        info!("Saved configuration to {:?}", self.config_path);
        Ok(())
    }

    pub fn update_property<F>(&self, mut updater: F) -> Result<()>
    where
        F: FnMut(&mut Config),
    {
        let mut config = self.load()?;
        updater(&mut config);
        self.save(&config)?;
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for ConfigLoader {
    fn save_rules(&self, rules: &RuleBook) -> crate::error::Result<()> {
        self.update_property(|config| config.set_rule_book(rules))
            .map_err(|e| BidError::Config(format!("{:#}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, Region, ThresholdRule};

    #[test]
    fn test_load_creates_default_then_saves_rules() {
        let dir = std::env::temp_dir().join(format!("moonbid-config-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let loader = ConfigLoader::at(dir.join("config.toml"));

        let config = loader.load().unwrap();
        assert!(config.rules.is_empty());
        assert_eq!(loader.base_dir(), dir);

        let mut book = RuleBook::default();
        book.add_rule(ThresholdRule {
            region: Region::Querious,
            category: Category::ManualExtractor,
            min_cost_index: 2.0,
        });
        book.exclude("Moon");
        loader.save_rules(&book).unwrap();

        let reloaded = loader.load().unwrap();
        assert_eq!(reloaded.rule_book(), book);

        let _ = fs::remove_dir_all(&dir);
    }
}
