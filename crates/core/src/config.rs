use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PIPEDRIVE_BASE_URL: &str = "https://api.pipedrive.com/api/v2";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub pipedrive: PipedriveConfig,
    pub reconcile: ReconcileConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Connection settings for the Pipedrive REST API.
#[derive(Clone, Debug)]
pub struct PipedriveConfig {
    pub api_token: SecretString,
    pub base_url: String,
    /// Company host used to build deal links, e.g. `acme.pipedrive.com`.
    pub domain: String,
    pub timeout_secs: u64,
    /// Custom field key holding an organization's tax id.
    pub tax_id_field: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ReconcileConfig {
    pub search_failure: SearchFailurePolicy,
    pub forward_tax_id: bool,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub transport: TransportKind,
    pub bind_address: String,
    pub port: u16,
    pub path: String,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// What a reconciler does when an entity search fails at the transport level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchFailurePolicy {
    /// Log and continue as if nothing matched, which leads to a create attempt.
    NotFound,
    /// Abort the resolution with the transport failure.
    Escalate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Http,
    Stdio,
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
    pub pipedrive_api_token: Option<String>,
    pub pipedrive_base_url: Option<String>,
    pub pipedrive_domain: Option<String>,
    pub transport: Option<TransportKind>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
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
            pipedrive: PipedriveConfig {
                api_token: String::new().into(),
                base_url: DEFAULT_PIPEDRIVE_BASE_URL.to_string(),
                domain: String::new(),
                timeout_secs: 30,
                tax_id_field: None,
            },
            reconcile: ReconcileConfig {
                search_failure: SearchFailurePolicy::NotFound,
                forward_tax_id: true,
            },
            server: ServerConfig {
                transport: TransportKind::Http,
                bind_address: "0.0.0.0".to_string(),
                port: 8080,
                path: "/mcp".to_string(),
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for SearchFailurePolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "not_found" => Ok(Self::NotFound),
            "escalate" => Ok(Self::Escalate),
            other => Err(ConfigError::Validation(format!(
                "unsupported search failure policy `{other}` (expected not_found|escalate)"
            ))),
        }
    }
}

impl std::str::FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "stdio" => Ok(Self::Stdio),
            other => Err(ConfigError::Validation(format!(
                "unsupported transport `{other}` (expected http|stdio)"
            ))),
        }
    }
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("pdops.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(pipedrive) = patch.pipedrive {
            if let Some(api_token_value) = pipedrive.api_token {
                self.pipedrive.api_token = secret_value(api_token_value);
            }
            if let Some(base_url) = pipedrive.base_url {
                self.pipedrive.base_url = base_url;
            }
            if let Some(domain) = pipedrive.domain {
                self.pipedrive.domain = domain;
            }
            if let Some(timeout_secs) = pipedrive.timeout_secs {
                self.pipedrive.timeout_secs = timeout_secs;
            }
            if let Some(tax_id_field) = pipedrive.tax_id_field {
                self.pipedrive.tax_id_field = Some(tax_id_field);
            }
        }

        if let Some(reconcile) = patch.reconcile {
            if let Some(search_failure) = reconcile.search_failure {
                self.reconcile.search_failure = search_failure;
            }
            if let Some(forward_tax_id) = reconcile.forward_tax_id {
                self.reconcile.forward_tax_id = forward_tax_id;
            }
        }

        if let Some(server) = patch.server {
            if let Some(transport) = server.transport {
                self.server.transport = transport;
            }
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(path) = server.path {
                self.server.path = path;
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
        if let Some(value) = read_env("PDOPS_PIPEDRIVE_API_TOKEN") {
            self.pipedrive.api_token = secret_value(value);
        }
        if let Some(value) = read_env("PDOPS_PIPEDRIVE_BASE_URL") {
            self.pipedrive.base_url = value;
        }
        if let Some(value) = read_env("PDOPS_PIPEDRIVE_DOMAIN") {
            self.pipedrive.domain = value;
        }
        if let Some(value) = read_env("PDOPS_PIPEDRIVE_TIMEOUT_SECS") {
            self.pipedrive.timeout_secs = parse_u64("PDOPS_PIPEDRIVE_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("PDOPS_PIPEDRIVE_TAX_ID_FIELD") {
            self.pipedrive.tax_id_field = Some(value);
        }

        if let Some(value) = read_env("PDOPS_RECONCILE_SEARCH_FAILURE") {
            self.reconcile.search_failure = value.parse()?;
        }
        if let Some(value) = read_env("PDOPS_RECONCILE_FORWARD_TAX_ID") {
            self.reconcile.forward_tax_id = parse_bool("PDOPS_RECONCILE_FORWARD_TAX_ID", &value)?;
        }

        if let Some(value) = read_env("PDOPS_SERVER_TRANSPORT") {
            self.server.transport = value.parse()?;
        }
        if let Some(value) = read_env("PDOPS_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("PDOPS_SERVER_PORT") {
            self.server.port = parse_u16("PDOPS_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("PDOPS_SERVER_PATH") {
            self.server.path = value;
        }
        if let Some(value) = read_env("PDOPS_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("PDOPS_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("PDOPS_LOGGING_LEVEL").or_else(|| read_env("PDOPS_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("PDOPS_LOGGING_FORMAT").or_else(|| read_env("PDOPS_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(api_token) = overrides.pipedrive_api_token {
            self.pipedrive.api_token = secret_value(api_token);
        }
        if let Some(base_url) = overrides.pipedrive_base_url {
            self.pipedrive.base_url = base_url;
        }
        if let Some(domain) = overrides.pipedrive_domain {
            self.pipedrive.domain = domain;
        }
        if let Some(transport) = overrides.transport {
            self.server.transport = transport;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_pipedrive(&self.pipedrive)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("pdops.toml"), PathBuf::from("config/pdops.toml")]
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

fn validate_pipedrive(pipedrive: &PipedriveConfig) -> Result<(), ConfigError> {
    if pipedrive.api_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "pipedrive.api_token is required. Get it from Pipedrive > Personal preferences > API"
                .to_string(),
        ));
    }

    let base_url = pipedrive.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "pipedrive.base_url must start with http:// or https://".to_string(),
        ));
    }

    if pipedrive.domain.trim().is_empty() {
        return Err(ConfigError::Validation(
            "pipedrive.domain is required (company host such as `acme.pipedrive.com`)"
                .to_string(),
        ));
    }

    if pipedrive.timeout_secs == 0 || pipedrive.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "pipedrive.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if pipedrive.tax_id_field.as_ref().is_some_and(|key| key.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "pipedrive.tax_id_field must not be blank when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.transport == TransportKind::Http && server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if !server.path.starts_with('/') {
        return Err(ConfigError::Validation("server.path must start with `/`".to_string()));
    }

    if server.path == "/" || server.path == "/health" {
        return Err(ConfigError::Validation(format!(
            "server.path `{}` collides with another route",
            server.path
        )));
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
    pipedrive: Option<PipedrivePatch>,
    reconcile: Option<ReconcilePatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct PipedrivePatch {
    api_token: Option<String>,
    base_url: Option<String>,
    domain: Option<String>,
    timeout_secs: Option<u64>,
    tax_id_field: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ReconcilePatch {
    search_failure: Option<SearchFailurePolicy>,
    forward_tax_id: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    transport: Option<TransportKind>,
    bind_address: Option<String>,
    port: Option<u16>,
    path: Option<String>,
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

    use super::{
        AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, SearchFailurePolicy,
        TransportKind,
    };

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

    fn required_overrides() -> ConfigOverrides {
        ConfigOverrides {
            pipedrive_api_token: Some("token-from-override".to_string()),
            pipedrive_domain: Some("acme.pipedrive.com".to_string()),
            ..ConfigOverrides::default()
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_PIPEDRIVE_TOKEN", "token-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("pdops.toml");
            fs::write(
                &path,
                r#"
[pipedrive]
api_token = "${TEST_PIPEDRIVE_TOKEN}"
domain = "acme.pipedrive.com"
tax_id_field = "4f1e0c2b"

[reconcile]
search_failure = "escalate"
forward_tax_id = false
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.pipedrive.api_token.expose_secret() == "token-from-env",
                "api token should be loaded from environment",
            )?;
            ensure(
                config.pipedrive.tax_id_field.as_deref() == Some("4f1e0c2b"),
                "tax id field key should be loaded from file",
            )?;
            ensure(
                config.reconcile.search_failure == SearchFailurePolicy::Escalate,
                "search failure policy should be loaded from file",
            )?;
            ensure(!config.reconcile.forward_tax_id, "forward_tax_id should be disabled")?;
            Ok(())
        })();

        clear_vars(&["TEST_PIPEDRIVE_TOKEN"]);
        result
    }

    #[test]
    fn missing_interpolation_variable_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("pdops.toml");
        fs::write(&path, "[pipedrive]\napi_token = \"${PDOPS_TEST_UNSET_TOKEN}\"\n")
            .map_err(|err| err.to_string())?;

        match AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() }) {
            Err(ConfigError::MissingEnvInterpolation { var }) => {
                ensure(var == "PDOPS_TEST_UNSET_TOKEN", "error should name the missing variable")
            }
            Err(other) => Err(format!("unexpected error: {other}")),
            Ok(_) => Err("expected interpolation failure".to_string()),
        }
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PDOPS_PIPEDRIVE_DOMAIN", "env.pipedrive.com");
        env::set_var("PDOPS_SERVER_TRANSPORT", "stdio");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("pdops.toml");
            fs::write(
                &path,
                r#"
[pipedrive]
api_token = "token-from-file"
domain = "file.pipedrive.com"
timeout_secs = 12

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    port: Some(9090),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.pipedrive.api_token.expose_secret() == "token-from-file",
                "file token should win over defaults",
            )?;
            ensure(config.pipedrive.timeout_secs == 12, "file timeout should win over defaults")?;
            ensure(
                config.pipedrive.domain == "env.pipedrive.com",
                "env domain should win over file",
            )?;
            ensure(config.server.transport == TransportKind::Stdio, "env transport should apply")?;
            ensure(config.logging.level == "debug", "override log level should win")?;
            ensure(config.server.port == 9090, "override port should win")?;
            Ok(())
        })();

        clear_vars(&["PDOPS_PIPEDRIVE_DOMAIN", "PDOPS_SERVER_TRANSPORT"]);
        result
    }

    #[test]
    fn validation_fails_fast_without_api_token() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let error = match AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                pipedrive_domain: Some("acme.pipedrive.com".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected validation failure but config load succeeded".to_string()),
            Err(error) => error,
        };
        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("pipedrive.api_token")
        );
        ensure(has_message, "validation failure should mention pipedrive.api_token")
    }

    #[test]
    fn invalid_env_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PDOPS_PIPEDRIVE_TIMEOUT_SECS", "soon");
        let result = AppConfig::load(LoadOptions {
            overrides: required_overrides(),
            ..LoadOptions::default()
        });
        clear_vars(&["PDOPS_PIPEDRIVE_TIMEOUT_SECS"]);

        ensure(
            matches!(
                result,
                Err(ConfigError::InvalidEnvOverride { ref key, .. })
                    if key == "PDOPS_PIPEDRIVE_TIMEOUT_SECS"
            ),
            "non-numeric timeout should be rejected",
        )
    }

    #[test]
    fn defaults_match_the_hosted_api() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config =
            AppConfig::load(LoadOptions { overrides: required_overrides(), ..LoadOptions::default() })
                .map_err(|err| format!("config load failed: {err}"))?;

        ensure(
            config.pipedrive.base_url == "https://api.pipedrive.com/api/v2",
            "default base url should target api v2",
        )?;
        ensure(config.server.bind_address == "0.0.0.0", "default bind address")?;
        ensure(config.server.port == 8080, "default port")?;
        ensure(config.server.transport == TransportKind::Http, "default transport")?;
        ensure(
            config.reconcile.search_failure == SearchFailurePolicy::NotFound,
            "search failures degrade to not-found by default",
        )?;
        ensure(config.reconcile.forward_tax_id, "tax id is forwarded by default")
    }

    #[test]
    fn mcp_path_cannot_shadow_health_route() -> Result<(), String> {
        let mut config = AppConfig::default();
        config.pipedrive.api_token = "token".to_string().into();
        config.pipedrive.domain = "acme.pipedrive.com".to_string();
        config.server.path = "/health".to_string();

        ensure(
            matches!(config.validate(), Err(ConfigError::Validation(ref message)) if message.contains("/health")),
            "health route collision should be rejected",
        )
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PDOPS_PIPEDRIVE_API_TOKEN", "b8928b-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions {
                overrides: ConfigOverrides {
                    pipedrive_domain: Some("acme.pipedrive.com".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("b8928b-secret-value"), "debug output should not contain token")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["PDOPS_PIPEDRIVE_API_TOKEN"]);
        result
    }
}
