//! Configuration file management.
//!
//! Loads user preferences from `~/.tornado-viz.toml`. The file is optional
//! and read-only at runtime; a commented template is written on first run.

use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

const DEFAULT_DEVICE_TIMEOUT_SECS: u64 = 3;

const CONFIG_TEMPLATE: &str = r#"# tornado-viz configuration file

# Capture device to prefer at startup, by cpal device name
# preferred_device = "pipewire"
# preferred_device_is_input = true

# Timeout in seconds when probing audio devices (default: 3)
# device_timeout_secs = 3
"#;

#[derive(Deserialize, Default)]
pub struct Config {
    pub preferred_device: Option<String>,
    pub preferred_device_is_input: Option<bool>,
    pub device_timeout_secs: Option<u64>,
}

impl Config {
    fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".tornado-viz.toml"))
    }

    pub fn load() -> Self {
        let path = match Self::path() {
            Some(p) => p,
            None => return Self::default(),
        };

        if !path.exists() {
            let _ = fs::write(&path, CONFIG_TEMPLATE);
            println!("Created config template at {:?}", path);
        }

        fs::read_to_string(&path)
            .ok()
            .and_then(|s| toml::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn device_timeout_secs(&self) -> u64 {
        self.device_timeout_secs
            .unwrap_or(DEFAULT_DEVICE_TIMEOUT_SECS)
    }
}
