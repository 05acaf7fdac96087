use std::{fs, path::PathBuf};

use eyre::Result;
use serde_json::Value;

use crate::logging;
use crate::settings::{CfgDefaultKeymaps, Keymap, Settings};

const APP_DIR: &str = "pilote";
const CONFIG_FILE: &str = "configuration.json";
const LOG_FILE: &str = "pilote.log";

#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    pub keymap: Keymap,
    keymap_user_dict: CfgDefaultKeymaps, // kept for the help window
    filepath: PathBuf,
}

impl Config {
    /// Load `configuration.json` from the app data prefix, writing the
    /// defaults there on first run.
    pub fn new() -> Result<Self> {
        let prefix = get_app_data_prefix()?;
        let filepath = prefix.join(CONFIG_FILE);

        if filepath.exists() {
            return Self::load_from(filepath);
        }

        let config = Self::from_parts(Settings::default(), CfgDefaultKeymaps::default(), filepath);
        config.save()?;
        logging::info(format!("Wrote default configuration to {}", config.filepath.display()));
        Ok(config)
    }

    /// Load configuration from a custom path. Unreadable sections fall back to defaults.
    pub fn load_from(filepath: PathBuf) -> Result<Self> {
        let mut settings = Settings::default();
        let mut keymap_user_dict = CfgDefaultKeymaps::default();

        if filepath.exists() {
            let config_str = fs::read_to_string(&filepath)?;
            match serde_json::from_str::<Value>(&config_str) {
                Ok(user_config) => {
                    if let Some(section) = user_config.get("Setting") {
                        match serde_json::from_value::<Settings>(section.clone()) {
                            Ok(user_settings) => settings.merge(user_settings),
                            Err(err) => logging::warn(format!("Ignoring invalid Setting section: {err}")),
                        }
                    }
                    if let Some(section) = user_config.get("Keymap") {
                        match serde_json::from_value::<CfgDefaultKeymaps>(section.clone()) {
                            Ok(user_keymap) => keymap_user_dict.merge(user_keymap),
                            Err(err) => logging::warn(format!("Ignoring invalid Keymap section: {err}")),
                        }
                    }
                }
                Err(err) => logging::warn(format!(
                    "Could not parse {}: {err}, using defaults",
                    filepath.display()
                )),
            }
        }

        Ok(Self::from_parts(settings, keymap_user_dict, filepath))
    }

    fn from_parts(settings: Settings, keymap_user_dict: CfgDefaultKeymaps, filepath: PathBuf) -> Self {
        Self {
            settings,
            keymap: Keymap::from(&keymap_user_dict),
            keymap_user_dict,
            filepath,
        }
    }

    pub fn filepath(&self) -> &PathBuf {
        &self.filepath
    }

    pub fn keymap_user_dict(&self) -> &CfgDefaultKeymaps {
        &self.keymap_user_dict
    }

    /// Log file next to the configuration file.
    pub fn log_path(&self) -> PathBuf {
        self.filepath
            .parent()
            .map(|dir| dir.join(LOG_FILE))
            .unwrap_or_else(|| PathBuf::from(LOG_FILE))
    }

    pub fn save(&self) -> Result<()> {
        let config_json = serde_json::json!({
            "Setting": self.settings,
            "Keymap": self.keymap_user_dict,
        });
        let config_str = serde_json::to_string_pretty(&config_json)?;

        if let Some(parent) = self.filepath.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.filepath, config_str)?;
        Ok(())
    }
}

pub fn get_app_data_prefix() -> Result<PathBuf> {
    if let Some(config_home) = std::env::var_os("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(config_home).join(APP_DIR));
    } else if let Some(home) = std::env::var_os("HOME") {
        let path = PathBuf::from(&home).join(".config").join(APP_DIR);
        if path.exists() {
            return Ok(path);
        }
        return Ok(PathBuf::from(home).join(format!(".{APP_DIR}")));
    } else if let Some(user_profile) = std::env::var_os("USERPROFILE") {
        return Ok(PathBuf::from(user_profile).join(format!(".{APP_DIR}")));
    }

    Err(eyre::eyre!("Could not determine application data directory"))
}
