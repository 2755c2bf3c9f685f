use serde::Deserialize;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_LLM_API_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4";
pub const DEFAULT_SMTP_SERVER: &str = "smtp.example.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_RESULTS_LOG_PATH: &str = "results.csv";
pub const DEFAULT_SESSION_DURATION_SECONDS: u64 = 3600;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8081";
pub const DEFAULT_SSE_TICK_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_METRICS_AUTH: &str = "admin:changeme";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub llm: LlmConfig,
    pub smtp: SmtpConfig,
    /// CSV results log; `None` disables the sink.
    pub results_log_path: Option<PathBuf>,
    /// Directory for per-submission PDF reports; `None` disables the sink.
    pub pdf_export_dir: Option<PathBuf>,
    pub session_duration_seconds: u64,
    pub require_email: bool,
    pub bind_addr: String,
    pub sse_tick_interval_ms: u64,
    pub metrics_auth: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub model: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub sender_email: Option<String>,
    pub sender_password: Option<String>,
    pub server: String,
    pub port: u16,
    pub use_tls: bool,
    pub send_disabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                api_key: None,
                api_base_url: DEFAULT_LLM_API_BASE_URL.to_string(),
                model: DEFAULT_LLM_MODEL.to_string(),
                timeout_seconds: None,
            },
            smtp: SmtpConfig {
                sender_email: None,
                sender_password: None,
                server: DEFAULT_SMTP_SERVER.to_string(),
                port: DEFAULT_SMTP_PORT,
                use_tls: true,
                send_disabled: false,
            },
            results_log_path: Some(PathBuf::from(DEFAULT_RESULTS_LOG_PATH)),
            pdf_export_dir: None,
            session_duration_seconds: DEFAULT_SESSION_DURATION_SECONDS,
            require_email: false,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            sse_tick_interval_ms: DEFAULT_SSE_TICK_INTERVAL_MS,
            metrics_auth: DEFAULT_METRICS_AUTH.to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Local .env is optional; real deployments inject the environment directly
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", app_env)).required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let defaults = Config::default();

        let api_key = lookup(&settings, "llm.api_key", "API_KEY");
        if api_key.is_none() {
            tracing::warn!("API_KEY is not set; AI questions and feedback are disabled");
        }

        let llm = LlmConfig {
            api_key,
            api_base_url: lookup(&settings, "llm.api_base_url", "LLM_API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.llm.api_base_url),
            model: lookup(&settings, "llm.model", "LLM_MODEL").unwrap_or(defaults.llm.model),
            timeout_seconds: parse_opt(&settings, "llm.timeout_seconds", "LLM_TIMEOUT_SECONDS")?,
        };

        let smtp = SmtpConfig {
            sender_email: lookup(&settings, "smtp.sender_email", "SENDER_EMAIL"),
            sender_password: lookup(&settings, "smtp.sender_password", "SENDER_PASSWORD"),
            server: lookup(&settings, "smtp.server", "SMTP_SERVER")
                .unwrap_or(defaults.smtp.server),
            port: parse_opt(&settings, "smtp.port", "SMTP_PORT")?.unwrap_or(defaults.smtp.port),
            use_tls: parse_flag(&settings, "smtp.use_tls", "SMTP_USE_TLS")?
                .unwrap_or(defaults.smtp.use_tls),
            send_disabled: parse_flag(&settings, "smtp.send_disabled", "EMAIL_SEND_DISABLED")?
                .unwrap_or(defaults.smtp.send_disabled),
        };

        // An explicitly empty value turns the results log off
        let results_log_path = match raw_lookup(&settings, "results.log_path", "RESULTS_LOG_PATH")
        {
            Some(path) if path.trim().is_empty() => None,
            Some(path) => Some(PathBuf::from(path)),
            None => defaults.results_log_path,
        };

        let pdf_export_dir =
            lookup(&settings, "results.pdf_export_dir", "PDF_EXPORT_DIR").map(PathBuf::from);

        let session_duration_seconds =
            parse_opt(&settings, "session.duration_seconds", "SESSION_DURATION_SECONDS")?
                .filter(|v: &u64| *v > 0)
                .unwrap_or(defaults.session_duration_seconds);

        Ok(Config {
            llm,
            smtp,
            results_log_path,
            pdf_export_dir,
            session_duration_seconds,
            require_email: parse_flag(&settings, "session.require_email", "REQUIRE_EMAIL")?
                .unwrap_or(defaults.require_email),
            bind_addr: lookup(&settings, "server.bind_addr", "BIND_ADDR")
                .unwrap_or(defaults.bind_addr),
            sse_tick_interval_ms: parse_opt(
                &settings,
                "server.sse_tick_interval_ms",
                "SSE_TICK_INTERVAL_MS",
            )?
            .filter(|v: &u64| *v > 0)
            .unwrap_or(defaults.sse_tick_interval_ms),
            metrics_auth: lookup(&settings, "server.metrics_auth", "METRICS_AUTH")
                .unwrap_or(defaults.metrics_auth),
        })
    }

    pub fn email_enabled(&self) -> bool {
        !self.smtp.send_disabled
    }
}

/// Settings key first, then the plain environment variable. Blank values count as unset.
fn lookup(settings: &config::Config, key: &str, env_key: &str) -> Option<String> {
    raw_lookup(settings, key, env_key).filter(|value| !value.trim().is_empty())
}

fn raw_lookup(settings: &config::Config, key: &str, env_key: &str) -> Option<String> {
    settings
        .get_string(key)
        .or_else(|_| env::var(env_key))
        .ok()
}

fn parse_opt<T>(
    settings: &config::Config,
    key: &str,
    env_key: &str,
) -> Result<Option<T>, config::ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(settings, key, env_key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| {
                config::ConfigError::Message(format!(
                    "Invalid value for {}: {} ({})",
                    env_key, raw, e
                ))
            })
        })
        .transpose()
}

fn parse_flag(
    settings: &config::Config,
    key: &str,
    env_key: &str,
) -> Result<Option<bool>, config::ConfigError> {
    lookup(settings, key, env_key)
        .map(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(config::ConfigError::Message(format!(
                "Invalid value for {}: {}",
                env_key, other
            ))),
        })
        .transpose()
}
