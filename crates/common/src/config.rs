//! # Configuration Module
//!
//! The `config` module provides functionality for loading and accessing configuration settings
//! used by applications that host a PAM conversation.
//!
//! # Usage
//!
//! Create a `Config` struct using the `load_file` function, providing the path to the
//! configuration file. Every setting that is missing or invalid keeps its default value.
//!
//! ```toml
//! [Configuration]
//! service = "login"
//! log_level = "info"
//! ```
//!
//! # Structs
//!
//! - [`Config`](struct.Config.html): Represents the configuration settings.
//!
//! ## License
//!
//! pamconv
//! Copyright (C) 2023 github.com/34N0
//!
//! This program is free software: you can redistribute it and/or modify
//! it under the terms of the GNU General Public License as published by
//! the Free Software Foundation, either version 3 of the License, or
//! (at your option) any later version.
//!
//! This program is distributed in the hope that it will be useful,
//! but WITHOUT ANY WARRANTY; without even the implied warranty of
//! MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//! GNU General Public License for more details.
//!
//! You should have received a copy of the GNU General Public License
//! along with this program.  If not, see <http://www.gnu.org/licenses/>.

use log::LevelFilter;
use std::{fs, path::PathBuf, str::FromStr};

const DEFAULT_CONFIG_FILE_PATH: &str = "/etc/security/pamconv.conf";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    // PAM service a transaction is started for.
    pub service: String,
    // Most verbose level forwarded to syslog.
    pub log_level: LevelFilter,
}

impl Default for Config {
    /// Creates a default 'Config' struct. Default configuration values are set here.
    fn default() -> Self {
        Config {
            service: "login".to_string(),
            log_level: LevelFilter::Info,
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file, returning a `Config` instance.
    ///
    /// # Arguments
    ///
    /// * `path`: An optional path to the TOML file. If not provided, the default configuration
    ///   file path is used.
    ///
    /// # Returns
    ///
    /// A `Config` instance populated with values from the configuration file, or the
    /// default values if the file is not present or cannot be loaded.
    #[must_use]
    pub fn load_file(path: Option<&str>) -> Config {
        let content =
            fs::read_to_string(PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE_PATH))).ok();

        let toml_table: Option<toml::value::Table> =
            content.and_then(|c| toml::de::from_str(&c).ok());

        let config = toml_table.and_then(|t| t.get("Configuration").cloned());

        config.map_or_else(Config::default, |s| Config {
            service: s
                .get("service")
                .and_then(toml::Value::as_str)
                .filter(|service| !service.is_empty())
                .map_or_else(|| Config::default().service, str::to_string),

            log_level: s
                .get("log_level")
                .and_then(toml::Value::as_str)
                .and_then(|level| LevelFilter::from_str(level).ok())
                .unwrap_or_else(|| Config::default().log_level),
        })
    }
}

// Unit Tests
#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    #[test]
    fn test_default_config() {
        let default_config = Config::default();
        assert_eq!(default_config.service, "login");
        assert_eq!(default_config.log_level, LevelFilter::Info);
    }

    #[test]
    fn test_build_config() {
        let temp_dir = TempDir::new("test_build_config").unwrap();
        let conf_file_path = temp_dir.path().join("pamconv.conf");

        let toml_content = r#"
        [Configuration]
        service = "gogs"
        log_level = "debug"
    "#;
        std::fs::write(&conf_file_path, toml_content).unwrap();

        let config = Config::load_file(Some(conf_file_path.to_str().unwrap()));

        assert_eq!(config.service, "gogs");
        assert_eq!(config.log_level, LevelFilter::Debug);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let temp_dir = TempDir::new("test_invalid_values_fall_back").unwrap();
        let conf_file_path = temp_dir.path().join("pamconv.conf");

        let toml_content = r#"
        [Configuration]
        service = ""
        log_level = "chatty"
    "#;
        std::fs::write(&conf_file_path, toml_content).unwrap();

        let config = Config::load_file(Some(conf_file_path.to_str().unwrap()));

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new("test_missing_file_uses_defaults").unwrap();
        let missing = temp_dir.path().join("absent.conf");

        let config = Config::load_file(Some(missing.to_str().unwrap()));

        assert_eq!(config, Config::default());
    }
}
