use serde::{Deserialize, Serialize};
use std::fs;
use std::str::FromStr;

use crate::error::ConfigurationError;

/// Deployment environment, resolved once at startup and passed explicitly to the builders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

impl FromStr for Environment {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ConfigurationError::UnknownEnvironment(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GatewaySettings {
    pub application: ApplicationSettings,
    pub origins: OriginSettings,
    pub routes: RouteSettings,
    pub session: SessionSettings,
    pub proxy: ProxySettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    /// Hostname the cookie domain is derived from. When unset the request host is used.
    pub cookie_host: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginSettings {
    pub front_url: Option<String>,
    pub app_url: Option<String>,
    pub api_url: Option<String>,
    /// Additional comma-separated origins
    pub extra: String,
    /// Root domain whose `https` sub-domains are accepted in production
    pub wildcard_root_domain: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteSettings {
    pub auth_only: Vec<String>,
    pub protected: Vec<String>,
    pub public: Vec<String>,
    pub api_prefix: String,
    pub login_path: String,
    pub home_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub store_url: String,
    pub store_timeout_ms: u64,
    /// Cookie lifetime used when the store does not report a usable expiry
    pub max_age_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub upstream_url: String,
    pub api_upstream_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            environment: Environment::Development,
            cookie_host: None,
        }
    }
}

impl Default for OriginSettings {
    fn default() -> Self {
        Self {
            front_url: Some("http://localhost:3000".to_string()),
            app_url: Some("http://localhost:3001".to_string()),
            api_url: Some("http://localhost:8080".to_string()),
            extra: String::new(),
            wildcard_root_domain: None,
        }
    }
}

impl Default for RouteSettings {
    fn default() -> Self {
        Self {
            auth_only: vec!["/login".to_string(), "/signup".to_string()],
            protected: vec![
                "/dashboard".to_string(),
                "/settings".to_string(),
                "/api".to_string(),
            ],
            public: vec!["/api/auth".to_string(), "/api/health".to_string()],
            api_prefix: "/api".to_string(),
            login_path: "/login".to_string(),
            home_path: "/".to_string(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            store_url: "http://localhost:4000".to_string(),
            store_timeout_ms: 2000,
            max_age_hours: 24,
        }
    }
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            upstream_url: "http://localhost:3001".to_string(),
            api_upstream_url: None,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingSettings {
    /// Logger configured with `level` as its filter (`RUST_LOG` syntax)
    #[must_use]
    pub fn logger_builder(&self) -> env_logger::Builder {
        let mut builder = env_logger::Builder::new();
        builder.parse_filters(&self.level);
        builder
    }

    /// Start the logger; a second init (tests, embedding) is harmless
    pub fn init_logger(&self) {
        let _ = self.logger_builder().try_init();
    }
}

impl GatewaySettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A settings file cannot be read or parsed
    /// - An environment override carries an invalid value (e.g. unknown `APP_ENV`)
    pub fn load() -> Result<Self, ConfigurationError> {
        Self::load_env_file();

        let (mut settings, source) = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings)?;

        // The level comes from the settings, so the logger starts only once they are known
        settings.logging.init_logger();
        match source {
            Some(path) => log::info!("Loaded settings from {}", path.display()),
            None => log::info!("No Settings.toml found, using defaults"),
        }
        log::debug!("Log filter: {}", settings.logging.level);

        Ok(settings)
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `CROSSGATE_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file exists but cannot be read or parsed
    fn load_base_settings() -> Result<(Self, Option<std::path::PathBuf>), ConfigurationError> {
        let mut settings = Self::default();
        let mut source = None;

        let default_config_path = std::path::PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_file(&default_config_path)?;
            source = Some(default_config_path);
        }

        if let Ok(secrets_dir) = std::env::var("CROSSGATE_SECRETS_DIR") {
            let secrets_path = std::path::Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                settings = Self::from_file(&secrets_path)?;
                source = Some(secrets_path);
            }
        }

        Ok((settings, source))
    }

    /// Parse a settings file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML for these settings
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigurationError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigurationError::SettingsFile(format!("{}: {e}", path.display())))?;
        basic_toml::from_str(&content)
            .map_err(|e| ConfigurationError::SettingsFile(format!("{}: {e}", path.display())))
    }

    /// Apply environment variable overrides to settings
    ///
    /// # Errors
    ///
    /// Returns an error if `APP_ENV` names an unknown environment
    pub fn apply_env_overrides(settings: &mut Self) -> Result<(), ConfigurationError> {
        Self::apply_application_env_overrides(&mut settings.application)?;
        Self::apply_origin_env_overrides(&mut settings.origins);
        Self::apply_session_env_overrides(&mut settings.session);
        Self::apply_proxy_env_overrides(&mut settings.proxy);
        Self::apply_logging_env_overrides(&mut settings.logging);
        Ok(())
    }

    fn apply_application_env_overrides(
        app_settings: &mut ApplicationSettings,
    ) -> Result<(), ConfigurationError> {
        if let Ok(host) = std::env::var("HOST") {
            app_settings.host = host;
        }
        if let Ok(port_str) = std::env::var("PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                app_settings.port = port;
            }
        }
        if let Ok(environment) = std::env::var("APP_ENV") {
            app_settings.environment = environment.parse()?;
        }
        if let Ok(cookie_host) = std::env::var("COOKIE_HOST") {
            app_settings.cookie_host = Some(cookie_host).filter(|h| !h.is_empty());
        }
        Ok(())
    }

    fn apply_origin_env_overrides(origin_settings: &mut OriginSettings) {
        Self::apply_optional_env_override("FRONT_URL", &mut origin_settings.front_url);
        Self::apply_optional_env_override("APP_URL", &mut origin_settings.app_url);
        Self::apply_optional_env_override("API_URL", &mut origin_settings.api_url);
        Self::apply_optional_env_override(
            "CORS_WILDCARD_DOMAIN",
            &mut origin_settings.wildcard_root_domain,
        );
        if let Ok(extra) = std::env::var("CORS_ORIGINS") {
            origin_settings.extra = extra;
        }
    }

    /// Apply environment overrides for session store settings
    pub fn apply_session_env_overrides(session_settings: &mut SessionSettings) {
        if let Ok(store_url) = std::env::var("SESSION_STORE_URL") {
            session_settings.store_url = store_url;
        }
        Self::apply_numeric_env_override(
            "SESSION_STORE_TIMEOUT_MS",
            &mut session_settings.store_timeout_ms,
        );
    }

    fn apply_proxy_env_overrides(proxy_settings: &mut ProxySettings) {
        if let Ok(upstream_url) = std::env::var("UPSTREAM_URL") {
            proxy_settings.upstream_url = upstream_url;
        }
        Self::apply_optional_env_override("API_UPSTREAM_URL", &mut proxy_settings.api_upstream_url);
    }

    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Helper function to apply numeric environment variable overrides
    fn apply_numeric_env_override(env_var: &str, target: &mut u64) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.parse::<u64>() {
                *target = value;
            }
        }
    }

    /// An empty value clears the setting
    fn apply_optional_env_override(env_var: &str, target: &mut Option<String>) {
        if let Ok(value) = std::env::var(env_var) {
            *target = Some(value).filter(|v| !v.trim().is_empty());
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                let line = line.trim();
                if line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    /// Get the bind address for the server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    /// All configured application origin strings, surfaces first
    #[must_use]
    pub fn get_known_origins(&self) -> Vec<String> {
        let surfaces = [
            &self.origins.front_url,
            &self.origins.app_url,
            &self.origins.api_url,
        ];
        surfaces
            .into_iter()
            .flatten()
            .cloned()
            .chain(
                self.origins
                    .extra
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
            )
            .collect()
    }

    #[must_use]
    pub fn store_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.session.store_timeout_ms)
    }
}
