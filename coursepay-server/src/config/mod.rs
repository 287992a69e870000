//! Configuration module for coursepay-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables. Also handles admin secret hashing.

pub mod file;
pub mod runtime;

use crate::config::file::{AuthConfig as FileAuthConfig, FileConfig};
use crate::config::runtime::{
    AdminConfig, AuthConfig, CallbackConfig, CheckoutConfig, GatewayConfig, ServerConfig,
    SharedConfig, StaticToken, SweeperConfig,
};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("password hashing error: {0}")]
    HashError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Loaded configuration result containing all parts.
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub callback: CallbackConfig,
    pub gateway: GatewayConfig,
    pub checkout: CheckoutConfig,
    pub auth: AuthConfig,
    pub sweeper: SweeperConfig,
}

impl LoadedConfig {
    /// Convert into a SharedConfig with Arc<RwLock<T>> wrappers.
    pub fn into_shared(self) -> SharedConfig {
        SharedConfig {
            server: Arc::new(RwLock::new(self.server)),
            admin: Arc::new(RwLock::new(self.admin)),
            callback: Arc::new(RwLock::new(self.callback)),
            gateway: Arc::new(RwLock::new(self.gateway)),
            checkout: Arc::new(RwLock::new(self.checkout)),
            auth: Arc::new(RwLock::new(self.auth)),
            sweeper: Arc::new(RwLock::new(self.sweeper)),
        }
    }
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Hash the admin secret if it's plaintext (and rewrite the file)
    /// 5. Build the loaded configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        self.validate(&file_config)?;

        let secret_hash = if file_config.is_admin_secret_hashed() {
            file_config.admin.secret.clone()
        } else {
            let hash = self.hash_secret(&file_config.admin.secret)?;
            file_config.admin.secret = hash.clone();
            self.rewrite_config(&file_config)?;
            tracing::info!("Admin secret hashed and config file updated");
            hash
        };

        self.build_loaded_config(file_config, secret_hash)
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn validate(&self, config: &FileConfig) -> Result<(), ConfigError> {
        if config.admin.secret.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "admin.secret must not be empty".to_owned(),
            ));
        }
        let currency = &config.checkout.currency;
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::ValidationError(format!(
                "checkout.currency {currency:?} is not an ISO 4217 code"
            )));
        }
        if config.gateway.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.timeout_secs must be positive".to_owned(),
            ));
        }
        if config.sweeper.enabled && config.sweeper.interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "sweeper.interval_secs must be positive".to_owned(),
            ));
        }
        if config
            .callback
            .token
            .as_deref()
            .is_some_and(|token| token.is_empty())
        {
            return Err(ConfigError::ValidationError(
                "callback.token must not be empty when set".to_owned(),
            ));
        }
        Ok(())
    }

    fn hash_secret(&self, plaintext: &str) -> Result<String, ConfigError> {
        use argon2::{
            Argon2, PasswordHasher,
            password_hash::{SaltString, rand_core::OsRng},
        };

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ConfigError::HashError(e.to_string()))
    }

    fn rewrite_config(&self, config: &FileConfig) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(config)?;

        // Write atomically: write to temp file, then rename
        let temp_path = self.config_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, toml_string)?;
        std::fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }

    fn build_loaded_config(
        &self,
        file_config: FileConfig,
        secret_hash: String,
    ) -> Result<LoadedConfig, ConfigError> {
        let gateway = file_config.gateway;
        let checkout = file_config.checkout;
        let sweeper = file_config.sweeper;

        Ok(LoadedConfig {
            server: ServerConfig {
                listen: file_config.server.listen,
            },
            admin: AdminConfig::new(secret_hash),
            callback: CallbackConfig {
                token: file_config.callback.token,
            },
            gateway: GatewayConfig {
                base_url: gateway.base_url,
                client_id: gateway.client_id,
                client_secret: gateway.client_secret,
                token_margin: Duration::from_secs(gateway.token_margin_secs),
                timeout: Duration::from_secs(gateway.timeout_secs),
            },
            checkout: CheckoutConfig {
                currency: checkout.currency.to_ascii_uppercase(),
                locale: checkout.locale,
                intent: checkout.intent,
                success_url: checkout.success_url,
                fail_url: checkout.fail_url,
                callback_url: checkout.callback_url,
            },
            auth: convert_auth(file_config.auth)?,
            sweeper: SweeperConfig {
                enabled: sweeper.enabled,
                interval: Duration::from_secs(sweeper.interval_secs),
                min_age: Duration::from_secs(sweeper.min_age_secs),
            },
        })
    }
}

fn convert_auth(auth: FileAuthConfig) -> Result<AuthConfig, ConfigError> {
    match (auth.base_url, auth.api_key) {
        (Some(base_url), Some(api_key)) => {
            if !auth.static_tokens.is_empty() {
                tracing::warn!("auth.static_tokens ignored because auth.base_url is set");
            }
            Ok(AuthConfig::Hosted { base_url, api_key })
        }
        (None, None) if !auth.static_tokens.is_empty() => Ok(AuthConfig::Static(
            auth.static_tokens
                .into_iter()
                .map(|t| StaticToken {
                    token: t.token,
                    user_id: t.user_id,
                })
                .collect(),
        )),
        (Some(_), None) | (None, Some(_)) => Err(ConfigError::ValidationError(
            "auth.base_url and auth.api_key must be set together".to_owned(),
        )),
        (None, None) => Err(ConfigError::ValidationError(
            "auth needs base_url and api_key, or at least one static token".to_owned(),
        )),
    }
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[admin]
secret = "back-office"

[gateway]
base_url = "https://ipay.ge/opay/api/v1"
client_id = "1006"
client_secret = "secret"

[checkout]
currency = "gel"
success_url = "https://courses.example.com/payment/success"
fail_url = "https://courses.example.com/payment/fail"

[[auth.static_tokens]]
token = "dev-token"
user_id = "5f0c7a52-43c4-4bbb-8f7c-7d3b0c8f1e11"
"#;

    fn write_config(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("coursepay-{}-{}", name, uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("coursepay.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_hashes_plaintext_secret_and_rewrites_file() {
        let path = write_config("hash", CONFIG);
        let loader = ConfigLoader::new(&path, None);

        let loaded = loader.load().unwrap();
        assert!(loaded.admin.secret_hash.starts_with("$argon2"));
        assert!(loaded.admin.verify_secret("back-office"));
        assert_eq!(loaded.checkout.currency, "GEL");
        assert!(matches!(loaded.auth, AuthConfig::Static(ref tokens) if tokens.len() == 1));

        let rewritten = std::fs::read_to_string(&path).unwrap();
        assert!(!rewritten.contains("\"back-office\""));
        assert!(!path.with_extension("toml.tmp").exists());

        // A second load keeps the existing hash.
        let reloaded = loader.reload().unwrap();
        assert_eq!(reloaded.admin.secret_hash, loaded.admin.secret_hash);
    }

    #[test]
    fn test_listen_override() {
        let path = write_config("listen", CONFIG);
        let listen: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        let loaded = ConfigLoader::new(&path, Some(listen)).load().unwrap();
        assert_eq!(loaded.server.listen, listen);
    }

    #[test]
    fn test_rejects_half_configured_hosted_auth() {
        let broken = CONFIG.replace(
            "[[auth.static_tokens]]\ntoken = \"dev-token\"\nuser_id = \"5f0c7a52-43c4-4bbb-8f7c-7d3b0c8f1e11\"\n",
            "[auth]\nbase_url = \"https://project.auth.example.com\"\n",
        );
        let path = write_config("auth", &broken);
        let err = ConfigLoader::new(&path, None).load().err().unwrap();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_rejects_bad_currency() {
        let path = write_config("currency", &CONFIG.replace("\"gel\"", "\"lari\""));
        let err = ConfigLoader::new(&path, None).load().err().unwrap();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
