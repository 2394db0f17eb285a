//! CLI utilities for binaries
//!
//! Resolves configuration file paths from the environment.

use std::path::PathBuf;

/// Type of configuration to load
#[derive(Debug, Clone)]
pub enum ConfigType {
    /// Scanner configuration (scanner_config.yaml)
    Scanner,
    /// Custom path
    Custom(String),
}

impl ConfigType {
    /// Get the default path for this config type
    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Scanner => "config/scanner_config.yaml",
            ConfigType::Custom(path) => path,
        }
    }

    /// Get the environment variable name for this config type
    pub fn env_var_name(&self) -> &str {
        match self {
            ConfigType::Scanner => "SCANNER_CONFIG_PATH",
            ConfigType::Custom(_) => "CONFIG_PATH",
        }
    }
}

/// Path from the config type's environment variable, or its default.
///
/// A `Custom` path always wins over the environment.
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    if let ConfigType::Custom(path) = &config_type {
        return PathBuf::from(path);
    }
    std::env::var(config_type.env_var_name())
        .unwrap_or_else(|_| config_type.default_path().to_string())
        .into()
}

/// Command line arguments, without the program name
pub fn parse_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

/// Config path from the first command line argument, falling back to the
/// environment
pub fn config_path_from_args(args: &[String], config_type: ConfigType) -> PathBuf {
    match args.first() {
        Some(path) => load_config_from_env(ConfigType::Custom(path.clone())),
        None => load_config_from_env(config_type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_type_paths() {
        assert_eq!(ConfigType::Scanner.default_path(), "config/scanner_config.yaml");

        let custom = ConfigType::Custom("custom/path.yaml".to_string());
        assert_eq!(custom.default_path(), "custom/path.yaml");
    }

    #[test]
    fn test_args_take_precedence() {
        let args = vec!["other.yaml".to_string()];
        assert_eq!(
            config_path_from_args(&args, ConfigType::Scanner),
            PathBuf::from("other.yaml")
        );
    }
}
