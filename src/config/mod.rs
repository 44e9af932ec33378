#[cfg(feature = "cli")]
pub mod cli;
pub mod facilities;

use crate::domain::model::EventType;
use crate::utils::error::{RelayError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub use facilities::FacilityRegistry;

pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_BATCH_DELAY_MS: u64 = 100;
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;
pub const MAX_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub max_body_size: usize,
    pub concurrency_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            max_body_size: 10 * 1024 * 1024,
            concurrency_limit: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub request_timeout_seconds: u64,
    pub batch_timeout_seconds: Option<u64>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay_ms: DEFAULT_BATCH_DELAY_MS,
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            batch_timeout_seconds: None,
        }
    }
}

impl DispatchConfig {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn batch_timeout(&self) -> Option<Duration> {
        self.batch_timeout_seconds.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub event_type: EventType,
    pub facilities_file: Option<String>,
    pub target_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "contact_relay=info".to_string(),
            json: false,
        }
    }
}

impl RelayConfig {
    /// Loads the config from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RelayError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        let mut config: Self =
            toml::from_str(&processed_content).map_err(|e| RelayError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;

        // An unset variable means no default target; `upload` then asks for one.
        config.upload.target_url = config
            .upload
            .target_url
            .filter(|url| !Self::has_unresolved_var(url));

        Ok(config)
    }

    fn has_unresolved_var(value: &str) -> bool {
        value.contains("${")
    }

    /// Replaces `${VAR}` with the environment value. Unset variables are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| RelayError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Loads the configured allow-list, or the bundled one when no file is set.
    pub fn facility_registry(&self) -> Result<FacilityRegistry> {
        match &self.upload.facilities_file {
            Some(path) => FacilityRegistry::from_file(path),
            None => Ok(FacilityRegistry::bundled()),
        }
    }
}

impl Validate for RelayConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("server.bind", &self.server.bind)?;
        self.server
            .bind
            .parse::<std::net::SocketAddr>()
            .map_err(|e| RelayError::InvalidConfigValueError {
                field: "server.bind".to_string(),
                value: self.server.bind.clone(),
                reason: e.to_string(),
            })?;
        validate_positive_number("server.max_body_size", self.server.max_body_size, 1)?;
        validate_positive_number("server.concurrency_limit", self.server.concurrency_limit, 1)?;

        validate_range("dispatch.batch_size", self.dispatch.batch_size, 1, MAX_BATCH_SIZE)?;
        validate_range("dispatch.batch_delay_ms", self.dispatch.batch_delay_ms, 0, 60_000)?;
        validate_range(
            "dispatch.request_timeout_seconds",
            self.dispatch.request_timeout_seconds,
            1,
            600,
        )?;
        if let Some(batch_timeout) = self.dispatch.batch_timeout_seconds {
            validate_range("dispatch.batch_timeout_seconds", batch_timeout, 1, 3600)?;
        }

        if let Some(path) = &self.upload.facilities_file {
            validate_path("upload.facilities_file", path)?;
        }
        if let Some(target_url) = &self.upload.target_url {
            crate::utils::validation::validate_url("upload.target_url", target_url)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = RelayConfig::from_toml_str("").unwrap();

        assert_eq!(config.dispatch.batch_size, 10);
        assert_eq!(config.dispatch.batch_delay(), Duration::from_millis(100));
        assert_eq!(config.dispatch.batch_timeout(), None);
        assert_eq!(config.upload.event_type, EventType::PatientDataUpload);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[server]
bind = "127.0.0.1:8080"
max_body_size = 1024
concurrency_limit = 4

[dispatch]
batch_size = 25
batch_delay_ms = 50
request_timeout_seconds = 5
batch_timeout_seconds = 60

[upload]
event_type = "OPD Feedback"
target_url = "https://hooks.example.com/patients"

[logging]
level = "debug"
json = true
"#;

        let config = RelayConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.dispatch.batch_size, 25);
        assert_eq!(config.dispatch.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.dispatch.batch_timeout(), Some(Duration::from_secs(60)));
        assert_eq!(config.upload.event_type, EventType::OpdFeedback);
        assert!(config.logging.json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("RELAY_TEST_TARGET_URL", "https://test.hooks.com/in");

        let toml_content = r#"
[upload]
target_url = "${RELAY_TEST_TARGET_URL}"
"#;

        let config = RelayConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.upload.target_url.as_deref(),
            Some("https://test.hooks.com/in")
        );

        std::env::remove_var("RELAY_TEST_TARGET_URL");
    }

    #[test]
    fn test_unset_target_url_variable_leaves_target_unset() {
        std::env::remove_var("RELAY_TEST_UNSET_TARGET_URL");

        let toml_content = r#"
[upload]
target_url = "${RELAY_TEST_UNSET_TARGET_URL}"
"#;

        let config = RelayConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.upload.target_url, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_example_config_is_valid_without_target_url() {
        let content = include_str!("../../relay.toml")
            .replace("${RELAY_TARGET_URL}", "${RELAY_TEST_EXAMPLE_TARGET_URL}");
        std::env::remove_var("RELAY_TEST_EXAMPLE_TARGET_URL");

        let config = RelayConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.upload.target_url, None);
        assert_eq!(config.dispatch.batch_size, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let config = RelayConfig::from_toml_str("[dispatch]\nbatch_size = 0\n").unwrap();
        assert!(config.validate().is_err());

        let config = RelayConfig::from_toml_str("[upload]\ntarget_url = \"not-a-url\"\n").unwrap();
        assert!(config.validate().is_err());

        let config = RelayConfig::from_toml_str("[server]\nbind = \"nowhere\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file_with_facilities() {
        let mut facilities = NamedTempFile::new().unwrap();
        facilities
            .write_all(b"facilities = [\"Only Clinic\"]\n")
            .unwrap();

        let mut temp_file = NamedTempFile::new().unwrap();
        let toml_content = format!(
            "[upload]\nfacilities_file = \"{}\"\n",
            facilities.path().to_str().unwrap().replace('\\', "/")
        );
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = RelayConfig::from_file(temp_file.path()).unwrap();
        let registry = config.facility_registry().unwrap();
        assert_eq!(registry.facilities, vec!["Only Clinic".to_string()]);
    }
}
