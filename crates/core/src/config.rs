use std::{
    fs::{self, File},
    io::Write,
    path::PathBuf,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    assets::{get_config_dir, get_default_config},
    reply::SeekerProfile,
};

#[derive(Error, Debug)]
pub enum StardustConfigError {
    #[error("File system error: {0}")]
    IO(#[from] std::io::Error),
    #[error("YAML parsing error: {0}")]
    YAMLError(#[from] serde_yaml::Error),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Reply backend selection. The source environments used `mock`/`real`, kept
/// here as aliases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleMode {
    #[default]
    #[serde(alias = "mock")]
    Local,
    #[serde(alias = "real")]
    Remote,
}

impl OracleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OracleMode::Local => "local",
            OracleMode::Remote => "remote",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OracleConfig {
    #[serde(default)]
    pub mode: OracleMode,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_app_id")]
    pub app_id: String,
    #[serde(default = "default_free_questions")]
    pub free_questions_per_day: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            mode: OracleMode::default(),
            base_url: String::new(),
            api_key: String::new(),
            timeout_ms: default_timeout_ms(),
            app_id: default_app_id(),
            free_questions_per_day: default_free_questions(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    15000
}

fn default_app_id() -> String {
    "stardust-app".to_string()
}

fn default_free_questions() -> u32 {
    3
}

impl OracleConfig {
    /// Resolve the configured API key. Values of the form `env:VAR_NAME`
    /// read the named environment variable.
    pub fn resolved_api_key(&self) -> Result<String, StardustConfigError> {
        if let Some(env_key) = self.api_key.strip_prefix("env:") {
            let env_key = env_key.trim();
            std::env::var(env_key).map_err(|_| {
                StardustConfigError::Config(format!("Environment variable {env_key} not found"))
            })
        } else {
            Ok(self.api_key.clone())
        }
    }

    /// Apply `STARDUST_ORACLE_*` environment overrides on top of the file
    /// values, matching the build-environment knobs of the source app.
    fn apply_env_overrides(&mut self) -> Result<(), StardustConfigError> {
        if let Ok(mode) = std::env::var("STARDUST_ORACLE_MODE") {
            self.mode = match mode.trim() {
                "local" | "mock" => OracleMode::Local,
                "remote" | "real" => OracleMode::Remote,
                other => {
                    return Err(StardustConfigError::Config(format!(
                        "Unknown oracle mode '{other}'"
                    )));
                }
            };
        }
        if let Ok(base_url) = std::env::var("STARDUST_ORACLE_BASE_URL") {
            self.base_url = base_url;
        }
        if let Ok(api_key) = std::env::var("STARDUST_ORACLE_API_KEY") {
            self.api_key = api_key;
        }
        if let Ok(timeout) = std::env::var("STARDUST_ORACLE_TIMEOUT_MS") {
            self.timeout_ms = timeout.trim().parse().map_err(|_| {
                StardustConfigError::Config(format!("Invalid timeout '{timeout}'"))
            })?;
        }
        if let Ok(app_id) = std::env::var("STARDUST_ORACLE_APP_ID") {
            self.app_id = app_id;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub profile: Option<SeekerProfile>,
}

pub fn create_or_get_config_file(
    config_path: Option<PathBuf>,
) -> Result<(bool, PathBuf), StardustConfigError> {
    let actual_path = config_path.unwrap_or_else(|| {
        let config_dir = get_config_dir();
        config_dir.join("stardust.yml")
    });

    let parent_dir = actual_path.parent().ok_or_else(|| {
        StardustConfigError::IO(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Config path has no parent directory",
        ))
    })?;

    if !parent_dir.exists() {
        fs::create_dir_all(parent_dir)?;
    }

    if actual_path.exists() {
        Ok((true, actual_path))
    } else {
        File::create(&actual_path)?.write_all(get_default_config().as_bytes())?;
        Ok((false, actual_path))
    }
}

pub fn get_config(config_path: Option<PathBuf>) -> Result<Config, StardustConfigError> {
    let (_, config_file) = create_or_get_config_file(config_path)?;
    let content = fs::read_to_string(&config_file)?;
    let mut config: Config = serde_yaml::from_str(&content)?;
    config.oracle.apply_env_overrides()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::{
        env,
        fs::{self, File},
        io::Write,
        path::PathBuf,
        sync::Mutex,
    };

    use tempfile::{NamedTempFile, env::temp_dir, tempdir};

    use super::*;

    // Mutex to serialize tests that modify the environment
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn create_temp_config(content: &str) -> PathBuf {
        let temp_dir = temp_dir();
        let config_path = NamedTempFile::new().unwrap().path().to_owned();
        fs::create_dir_all(&temp_dir).unwrap();
        File::create(&config_path)
            .unwrap()
            .write_all(content.as_bytes())
            .unwrap();
        config_path
    }

    const DUMMY_CONFIG_CONTENT: &str = r#"
oracle:
  mode: remote
  base_url: https://oracle.example.com
  api_key: secret
  timeout_ms: 5000
  app_id: test-app
  free_questions_per_day: 5
profile:
  name: Luna
  sign: pisces
"#;

    #[test]
    fn test_oracle_config_defaults() {
        let config = OracleConfig::default();
        assert_eq!(config.mode, OracleMode::Local);
        assert_eq!(config.base_url, "");
        assert_eq!(config.api_key, "");
        assert_eq!(config.timeout_ms, 15000);
        assert_eq!(config.app_id, "stardust-app");
        assert_eq!(config.free_questions_per_day, 3);
    }

    #[test]
    fn test_get_config_for_valid_schema() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config_file = create_temp_config(DUMMY_CONFIG_CONTENT);
        let config = get_config(Some(config_file)).unwrap();

        assert_eq!(config.oracle.mode, OracleMode::Remote);
        assert_eq!(config.oracle.base_url, "https://oracle.example.com");
        assert_eq!(config.oracle.timeout_ms, 5000);
        assert_eq!(config.oracle.free_questions_per_day, 5);
        let profile = config.profile.unwrap();
        assert_eq!(profile.name.as_deref(), Some("Luna"));
        assert_eq!(profile.focus, None);
    }

    #[test]
    fn test_get_config_applies_defaults_for_empty_sections() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config_file = create_temp_config("oracle: {}\n");
        let config = get_config(Some(config_file)).unwrap();

        assert_eq!(config.oracle.mode, OracleMode::Local);
        assert_eq!(config.oracle.free_questions_per_day, 3);
        assert!(config.profile.is_none());
    }

    #[test]
    fn test_mode_aliases_parse() {
        let config: Config = serde_yaml::from_str("oracle:\n  mode: mock\n").unwrap();
        assert_eq!(config.oracle.mode, OracleMode::Local);
        let config: Config = serde_yaml::from_str("oracle:\n  mode: real\n").unwrap();
        assert_eq!(config.oracle.mode, OracleMode::Remote);
    }

    #[test]
    fn test_resolved_api_key_env_indirection() {
        let _guard = ENV_MUTEX.lock().unwrap();
        unsafe {
            env::set_var("STARDUST_TEST_ORACLE_KEY", "from-env");
        }
        let config = OracleConfig {
            api_key: "env:STARDUST_TEST_ORACLE_KEY".to_string(),
            ..Default::default()
        };
        assert_eq!(config.resolved_api_key().unwrap(), "from-env");
        unsafe {
            env::remove_var("STARDUST_TEST_ORACLE_KEY");
        }

        let err = config.resolved_api_key().unwrap_err();
        assert!(matches!(err, StardustConfigError::Config(_)));
    }

    #[test]
    fn test_env_overrides_win_over_file_values() {
        let _guard = ENV_MUTEX.lock().unwrap();
        unsafe {
            env::set_var("STARDUST_ORACLE_MODE", "real");
            env::set_var("STARDUST_ORACLE_BASE_URL", "https://override.example.com");
            env::set_var("STARDUST_ORACLE_TIMEOUT_MS", "250");
        }

        let config_file = create_temp_config("oracle:\n  mode: local\n  timeout_ms: 5000\n");
        let config = get_config(Some(config_file)).unwrap();

        unsafe {
            env::remove_var("STARDUST_ORACLE_MODE");
            env::remove_var("STARDUST_ORACLE_BASE_URL");
            env::remove_var("STARDUST_ORACLE_TIMEOUT_MS");
        }

        assert_eq!(config.oracle.mode, OracleMode::Remote);
        assert_eq!(config.oracle.base_url, "https://override.example.com");
        assert_eq!(config.oracle.timeout_ms, 250);
    }

    #[test]
    fn test_create_or_get_config_file_when_exists() {
        let config_path = create_temp_config(DUMMY_CONFIG_CONTENT);

        let (exists, file_path) = create_or_get_config_file(Some(config_path.clone())).unwrap();

        assert!(exists);
        assert_eq!(file_path, config_path);
        assert!(file_path.exists());
    }

    #[test]
    fn test_create_or_get_config_file_when_not_exist() {
        let config_dir = tempdir().unwrap();
        let config_file = config_dir.path().join("stardust.yml");

        let (exists, file_path) = create_or_get_config_file(Some(config_file.clone())).unwrap();

        assert!(!exists);
        assert_eq!(file_path, config_file);
        assert!(file_path.exists());

        // The seeded file parses back as a valid config.
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = get_config(Some(file_path)).unwrap();
        assert_eq!(config.oracle.mode, OracleMode::Local);
    }

    #[test]
    fn test_get_config_throws_for_invalid_yaml() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config_file = create_temp_config("invalid yaml content: - [");
        let err = get_config(Some(config_file)).unwrap_err();
        assert!(matches!(err, StardustConfigError::YAMLError(_)));
        assert!(format!("{err}").contains("YAML parsing error"));
    }
}
