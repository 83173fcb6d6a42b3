use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub chat: ChatConfig,
    pub prices: PricesConfig,
    pub alerts: AlertsConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub bot_token: SecretString,
    pub admin_user_id: String,
    pub poll_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct PricesConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct AlertsConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub bot_token: Option<String>,
    pub admin_user_id: Option<String>,
    pub prices_base_url: Option<String>,
    pub alerts_enabled: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://shopbot.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            chat: ChatConfig {
                bot_token: String::new().into(),
                admin_user_id: String::new(),
                poll_timeout_secs: 30,
            },
            prices: PricesConfig {
                base_url: "https://api.coingecko.com/api/v3".to_string(),
                timeout_secs: 10,
                max_retries: 3,
            },
            alerts: AlertsConfig { enabled: true, interval_secs: 300 },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("shopbot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(chat) = patch.chat {
            if let Some(bot_token_value) = chat.bot_token {
                self.chat.bot_token = secret_value(bot_token_value);
            }
            if let Some(admin_user_id) = chat.admin_user_id {
                self.chat.admin_user_id = admin_user_id;
            }
            if let Some(poll_timeout_secs) = chat.poll_timeout_secs {
                self.chat.poll_timeout_secs = poll_timeout_secs;
            }
        }

        if let Some(prices) = patch.prices {
            if let Some(base_url) = prices.base_url {
                self.prices.base_url = base_url;
            }
            if let Some(timeout_secs) = prices.timeout_secs {
                self.prices.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = prices.max_retries {
                self.prices.max_retries = max_retries;
            }
        }

        if let Some(alerts) = patch.alerts {
            if let Some(enabled) = alerts.enabled {
                self.alerts.enabled = enabled;
            }
            if let Some(interval_secs) = alerts.interval_secs {
                self.alerts.interval_secs = interval_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SHOPBOT_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("SHOPBOT_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("SHOPBOT_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("SHOPBOT_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("SHOPBOT_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SHOPBOT_CHAT_BOT_TOKEN") {
            self.chat.bot_token = secret_value(value);
        }
        if let Some(value) = read_env("SHOPBOT_CHAT_ADMIN_USER_ID") {
            self.chat.admin_user_id = value;
        }
        if let Some(value) = read_env("SHOPBOT_CHAT_POLL_TIMEOUT_SECS") {
            self.chat.poll_timeout_secs = parse_u64("SHOPBOT_CHAT_POLL_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SHOPBOT_PRICES_BASE_URL") {
            self.prices.base_url = value;
        }
        if let Some(value) = read_env("SHOPBOT_PRICES_TIMEOUT_SECS") {
            self.prices.timeout_secs = parse_u64("SHOPBOT_PRICES_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("SHOPBOT_PRICES_MAX_RETRIES") {
            self.prices.max_retries = parse_u32("SHOPBOT_PRICES_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("SHOPBOT_ALERTS_ENABLED") {
            self.alerts.enabled = parse_bool("SHOPBOT_ALERTS_ENABLED", &value)?;
        }
        if let Some(value) = read_env("SHOPBOT_ALERTS_INTERVAL_SECS") {
            self.alerts.interval_secs = parse_u64("SHOPBOT_ALERTS_INTERVAL_SECS", &value)?;
        }

        if let Some(value) = read_env("SHOPBOT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SHOPBOT_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port = parse_u16("SHOPBOT_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("SHOPBOT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("SHOPBOT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("SHOPBOT_LOGGING_LEVEL").or_else(|| read_env("SHOPBOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SHOPBOT_LOGGING_FORMAT").or_else(|| read_env("SHOPBOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(bot_token) = overrides.bot_token {
            self.chat.bot_token = secret_value(bot_token);
        }
        if let Some(admin_user_id) = overrides.admin_user_id {
            self.chat.admin_user_id = admin_user_id;
        }
        if let Some(prices_base_url) = overrides.prices_base_url {
            self.prices.base_url = prices_base_url;
        }
        if let Some(alerts_enabled) = overrides.alerts_enabled {
            self.alerts.enabled = alerts_enabled;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_chat(&self.chat)?;
        validate_prices(&self.prices)?;
        validate_alerts(&self.alerts)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("shopbot.toml"), PathBuf::from("config/shopbot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_chat(chat: &ChatConfig) -> Result<(), ConfigError> {
    if chat.bot_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "chat.bot_token is required; set it in shopbot.toml or SHOPBOT_CHAT_BOT_TOKEN"
                .to_string(),
        ));
    }

    if chat.admin_user_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "chat.admin_user_id is required so support relays have a destination".to_string(),
        ));
    }

    if chat.poll_timeout_secs == 0 || chat.poll_timeout_secs > 90 {
        return Err(ConfigError::Validation(
            "chat.poll_timeout_secs must be in range 1..=90".to_string(),
        ));
    }

    Ok(())
}

fn validate_prices(prices: &PricesConfig) -> Result<(), ConfigError> {
    if !prices.base_url.starts_with("http://") && !prices.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "prices.base_url must start with http:// or https://".to_string(),
        ));
    }

    if prices.timeout_secs == 0 || prices.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "prices.timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    Ok(())
}

fn validate_alerts(alerts: &AlertsConfig) -> Result<(), ConfigError> {
    if alerts.enabled && (alerts.interval_secs < 10 || alerts.interval_secs > 86_400) {
        return Err(ConfigError::Validation(
            "alerts.interval_secs must be in range 10..=86400 when alerts are enabled".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    chat: Option<ChatPatch>,
    prices: Option<PricesPatch>,
    alerts: Option<AlertsPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatPatch {
    bot_token: Option<String>,
    admin_user_id: Option<String>,
    poll_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PricesPatch {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct AlertsPatch {
    enabled: Option<bool>,
    interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_SHOPBOT_BOT_TOKEN", "token-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("shopbot.toml");
            fs::write(
                &path,
                r#"
[chat]
bot_token = "${TEST_SHOPBOT_BOT_TOKEN}"
admin_user_id = "A1"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.chat.bot_token.expose_secret() == "token-from-env",
                "bot token should be loaded from environment",
            )?;
            ensure(config.chat.admin_user_id == "A1", "admin id should come from the file")?;
            Ok(())
        })();

        clear_vars(&["TEST_SHOPBOT_BOT_TOKEN"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SHOPBOT_CHAT_BOT_TOKEN", "token-test");
        env::set_var("SHOPBOT_CHAT_ADMIN_USER_ID", "A1");
        env::set_var("SHOPBOT_LOG_LEVEL", "warn");
        env::set_var("SHOPBOT_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&[
            "SHOPBOT_CHAT_BOT_TOKEN",
            "SHOPBOT_CHAT_ADMIN_USER_ID",
            "SHOPBOT_LOG_LEVEL",
            "SHOPBOT_LOG_FORMAT",
        ]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SHOPBOT_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("SHOPBOT_CHAT_BOT_TOKEN", "token-from-env");
        env::set_var("SHOPBOT_CHAT_ADMIN_USER_ID", "A-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("shopbot.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[chat]
bot_token = "token-from-file"
admin_user_id = "A-file"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.chat.bot_token.expose_secret() == "token-from-env",
                "env bot token should win over file and defaults",
            )?;
            ensure(
                config.chat.admin_user_id == "A-env",
                "env admin id should win over file and defaults",
            )?;
            Ok(())
        })();

        clear_vars(&[
            "SHOPBOT_DATABASE_URL",
            "SHOPBOT_CHAT_BOT_TOKEN",
            "SHOPBOT_CHAT_ADMIN_USER_ID",
        ]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SHOPBOT_CHAT_BOT_TOKEN", "token-test");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("chat.admin_user_id")
            );
            ensure(has_message, "validation failure should mention chat.admin_user_id")
        })();

        clear_vars(&["SHOPBOT_CHAT_BOT_TOKEN"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SHOPBOT_CHAT_BOT_TOKEN", "token-secret-value");
        env::set_var("SHOPBOT_CHAT_ADMIN_USER_ID", "A1");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("token-secret-value"),
                "debug output should not contain the bot token",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["SHOPBOT_CHAT_BOT_TOKEN", "SHOPBOT_CHAT_ADMIN_USER_ID"]);
        result
    }

    #[test]
    fn alerts_interval_is_validated_when_enabled() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SHOPBOT_CHAT_BOT_TOKEN", "token-test");
        env::set_var("SHOPBOT_CHAT_ADMIN_USER_ID", "A1");
        env::set_var("SHOPBOT_ALERTS_INTERVAL_SECS", "1");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected interval validation failure".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(
                    error,
                    ConfigError::Validation(ref message) if message.contains("alerts.interval_secs")
                ),
                "validation failure should mention alerts.interval_secs",
            )
        })();

        clear_vars(&[
            "SHOPBOT_CHAT_BOT_TOKEN",
            "SHOPBOT_CHAT_ADMIN_USER_ID",
            "SHOPBOT_ALERTS_INTERVAL_SECS",
        ]);
        result
    }
}
