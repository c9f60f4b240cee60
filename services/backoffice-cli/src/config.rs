//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The login password is read from BACKOFFICE_PASSWORD and never stored in
//! the TOML.

use backoffice_auth::{DEFAULT_PRESIGNED_PATTERNS, DEFAULT_PUBLIC_ENDPOINTS};
use backoffice_session::AuthPolicy;
use common::Secret;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const BASE_URL_ENV: &str = "BACKOFFICE_BASE_URL";
pub const PASSWORD_ENV: &str = "BACKOFFICE_PASSWORD";

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// REST backend settings
#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Credential storage and auth exemptions
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    /// File backing the durable ("remember me") scope
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
    #[serde(default = "default_public_endpoints")]
    pub public_endpoints: Vec<String>,
    #[serde(default = "default_presigned_patterns")]
    pub presigned_patterns: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            public_endpoints: default_public_endpoints(),
            presigned_patterns: default_presigned_patterns(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(".backoffice/session.json")
}

fn default_public_endpoints() -> Vec<String> {
    DEFAULT_PUBLIC_ENDPOINTS.iter().map(|s| s.to_string()).collect()
}

fn default_presigned_patterns() -> Vec<String> {
    DEFAULT_PRESIGNED_PATTERNS.iter().map(|s| s.to_string()).collect()
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            config.backend.base_url = url;
        }

        if !config.backend.base_url.starts_with("http://")
            && !config.backend.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                config.backend.base_url
            )));
        }

        if config.backend.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if config.session.public_endpoints.is_empty() {
            return Err(common::Error::Config(
                "public_endpoints must list at least the login endpoint".into(),
            ));
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("backoffice.toml")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_secs)
    }

    pub fn auth_policy(&self) -> AuthPolicy {
        AuthPolicy::new(
            self.session.public_endpoints.clone(),
            self.session.presigned_patterns.clone(),
        )
    }
}

/// Login password from BACKOFFICE_PASSWORD.
pub fn password_from_env() -> common::Result<Secret<String>> {
    match std::env::var(PASSWORD_ENV) {
        Ok(password) if !password.is_empty() => Ok(Secret::new(password)),
        _ => Err(common::Error::MissingEnv(PASSWORD_ENV.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("backoffice.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    const MINIMAL: &str = r#"
[backend]
base_url = "https://api.backoffice.test"
"#;

    #[test]
    fn test_load_minimal_config_uses_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env(BASE_URL_ENV) };
        let dir = tempfile::tempdir().unwrap();

        let config = Config::load(&write_config(&dir, MINIMAL)).unwrap();
        assert_eq!(config.backend.base_url, "https://api.backoffice.test");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(
            config.session.storage_path,
            PathBuf::from(".backoffice/session.json")
        );
        assert_eq!(config.session.public_endpoints, ["/auth/login", "/auth/refresh"]);
        assert_eq!(config.session.presigned_patterns, ["bucket", "s3.amazonaws.com"]);
    }

    #[test]
    fn test_load_full_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env(BASE_URL_ENV) };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[backend]
base_url = "http://localhost:3000"
timeout_secs = 5

[session]
storage_path = "/tmp/bo/session.json"
public_endpoints = ["/auth/login", "/auth/refresh", "/public"]
presigned_patterns = ["storage.example"]
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.session.public_endpoints.len(), 3);

        let policy = config.auth_policy();
        assert!(policy.is_public("/public/terms"));
        assert!(policy.is_presigned("https://storage.example/put?sig=1"));
        assert!(!policy.is_presigned("https://files-bucket.s3.amazonaws.com/a"));
    }

    #[test]
    fn test_base_url_env_overrides_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, MINIMAL);

        unsafe { set_env(BASE_URL_ENV, "https://staging.backoffice.test") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env(BASE_URL_ENV) };

        assert_eq!(config.backend.base_url, "https://staging.backoffice.test");
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/path/backoffice.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(&write_config(&dir, "not valid {{{{ toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env(BASE_URL_ENV) };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[backend]\nbase_url = \"api.backoffice.test\"\n");

        let err = Config::load(&path).unwrap_err().to_string();
        assert!(
            err.contains("base_url must start with http"),
            "error message should explain the issue, got: {err}"
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env(BASE_URL_ENV) };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "[backend]\nbase_url = \"https://a.test\"\ntimeout_secs = 0\n",
        );
        assert!(Config::load(&path).is_err(), "timeout_secs = 0 must be rejected");
    }

    #[test]
    fn test_empty_public_endpoints_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env(BASE_URL_ENV) };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "[backend]\nbase_url = \"https://a.test\"\n\n[session]\npublic_endpoints = []\n",
        );
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_resolve_path_cli_overrides_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/should-lose.toml") };
        let path = Config::resolve_path(Some("/cli/wins.toml"));
        assert_eq!(path, PathBuf::from("/cli/wins.toml"));

        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("/env/should-lose.toml"));
        unsafe { remove_env("CONFIG_PATH") };
    }

    #[test]
    fn test_resolve_path_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONFIG_PATH") };
        assert_eq!(Config::resolve_path(None), PathBuf::from("backoffice.toml"));
    }

    #[test]
    fn test_password_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env(PASSWORD_ENV) };
        assert!(matches!(
            password_from_env(),
            Err(common::Error::MissingEnv(name)) if name == PASSWORD_ENV
        ));

        unsafe { set_env(PASSWORD_ENV, "hunter2") };
        let password = password_from_env().unwrap();
        unsafe { remove_env(PASSWORD_ENV) };
        assert_eq!(password.expose(), "hunter2");
        assert_eq!(format!("{password:?}"), "[REDACTED]");
    }
}
