use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u32(value: &str) -> Result<u32, String> {
    let parsed = value
        .parse::<u32>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_temperature(value: &str) -> Result<f32, String> {
    let parsed = value
        .parse::<f32>()
        .map_err(|error| format!("failed to parse float: {error}"))?;
    if !parsed.is_finite() || !(0.0..=2.0).contains(&parsed) {
        return Err("value must be a finite number in range 0.0..=2.0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliLlmAuthScheme {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `api-key: <key>`, as Azure OpenAI deployments expect.
    ApiKeyHeader,
}

#[derive(Debug, Parser)]
#[command(
    name = "tfia-action-server",
    about = "Action server for the test-failure assistant chatbot",
    version
)]
pub struct Cli {
    #[arg(
        long,
        env = "TFIA_BIND",
        default_value = "127.0.0.1:5055",
        help = "Socket address the action server listens on"
    )]
    pub bind: String,

    #[arg(
        long = "upload-dir",
        env = "TFIA_UPLOAD_DIR",
        default_value = "uploads",
        help = "Directory where uploaded test-result files are stored"
    )]
    pub upload_dir: PathBuf,

    #[arg(
        long = "max-upload-bytes",
        env = "TFIA_MAX_UPLOAD_BYTES",
        default_value_t = 16 * 1024 * 1024,
        value_parser = parse_positive_usize,
        help = "Maximum accepted upload request body size in bytes"
    )]
    pub max_upload_bytes: usize,

    #[arg(
        long = "max-webhook-bytes",
        env = "TFIA_MAX_WEBHOOK_BYTES",
        default_value_t = 128 * 1024 * 1024,
        value_parser = parse_positive_usize,
        help = "Maximum accepted webhook request body size in bytes; raised to 8x --max-upload-bytes when lower"
    )]
    pub max_webhook_bytes: usize,

    #[arg(
        long = "dashboard-origin",
        env = "TFIA_DASHBOARD_ORIGIN",
        help = "Scheme and host of the CDCARM dashboard; overrides the catalog value"
    )]
    pub dashboard_origin: Option<String>,

    #[arg(
        long = "catalog",
        env = "TFIA_CATALOG",
        help = "Optional TOML file with platform/release lookup tables and default ids"
    )]
    pub catalog: Option<PathBuf>,

    #[arg(
        long = "llm-enabled",
        env = "TFIA_LLM_ENABLED",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Enable language-model failure cause prediction"
    )]
    pub llm_enabled: bool,

    #[arg(
        long = "llm-api-base",
        env = "TFIA_LLM_API_BASE",
        default_value = "https://api.openai.com/v1",
        help = "Base URL for the OpenAI-compatible chat-completions API"
    )]
    pub llm_api_base: String,

    #[arg(
        long = "llm-api-key",
        env = "TFIA_LLM_API_KEY",
        hide_env_values = true,
        help = "API key for the chat-completions API"
    )]
    pub llm_api_key: Option<String>,

    #[arg(
        long = "llm-auth-scheme",
        env = "TFIA_LLM_AUTH_SCHEME",
        value_enum,
        default_value_t = CliLlmAuthScheme::Bearer,
        help = "How the API key is sent to the chat-completions API"
    )]
    pub llm_auth_scheme: CliLlmAuthScheme,

    #[arg(
        long = "llm-model",
        env = "TFIA_LLM_MODEL",
        default_value = "gpt-4o-mini",
        help = "Model used for failure cause prediction"
    )]
    pub llm_model: String,

    #[arg(
        long = "llm-request-timeout-ms",
        env = "TFIA_LLM_REQUEST_TIMEOUT_MS",
        default_value_t = 30_000,
        value_parser = parse_positive_u64,
        help = "Per-request timeout for chat-completions calls"
    )]
    pub llm_request_timeout_ms: u64,

    #[arg(
        long = "llm-max-retries",
        env = "TFIA_LLM_MAX_RETRIES",
        default_value_t = 2,
        help = "Retries for retryable chat-completions failures"
    )]
    pub llm_max_retries: usize,

    #[arg(
        long = "llm-retry-budget-ms",
        env = "TFIA_LLM_RETRY_BUDGET_MS",
        default_value_t = 0,
        help = "Total retry delay budget in milliseconds (0 disables the budget)"
    )]
    pub llm_retry_budget_ms: u64,

    #[arg(
        long = "llm-max-tokens",
        env = "TFIA_LLM_MAX_TOKENS",
        default_value_t = 300,
        value_parser = parse_positive_u32,
        help = "Maximum tokens generated per prediction"
    )]
    pub llm_max_tokens: u32,

    #[arg(
        long = "llm-temperature",
        env = "TFIA_LLM_TEMPERATURE",
        default_value_t = 0.7,
        value_parser = parse_temperature,
        help = "Sampling temperature for predictions"
    )]
    pub llm_temperature: f32,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, CliLlmAuthScheme};

    #[test]
    fn defaults_cover_local_development() {
        let cli = Cli::try_parse_from(["tfia-action-server"]).expect("parse defaults");
        assert_eq!(cli.bind, "127.0.0.1:5055");
        assert_eq!(cli.max_upload_bytes, 16 * 1024 * 1024);
        assert_eq!(cli.max_webhook_bytes, 128 * 1024 * 1024);
        assert!(!cli.llm_enabled);
        assert_eq!(cli.llm_max_tokens, 300);
        assert!((cli.llm_temperature - 0.7).abs() < f32::EPSILON);
        assert!(cli.catalog.is_none());
        assert_eq!(cli.llm_auth_scheme, CliLlmAuthScheme::Bearer);
    }

    #[test]
    fn auth_scheme_accepts_kebab_case_names() {
        let cli = Cli::try_parse_from(["tfia-action-server", "--llm-auth-scheme", "api-key-header"])
            .expect("parse auth scheme");
        assert_eq!(cli.llm_auth_scheme, CliLlmAuthScheme::ApiKeyHeader);
        assert!(
            Cli::try_parse_from(["tfia-action-server", "--llm-auth-scheme", "basic"]).is_err()
        );
    }

    #[test]
    fn llm_flag_accepts_bare_and_explicit_forms() {
        let bare = Cli::try_parse_from(["tfia-action-server", "--llm-enabled"]).expect("bare");
        assert!(bare.llm_enabled);
        let explicit =
            Cli::try_parse_from(["tfia-action-server", "--llm-enabled=false"]).expect("explicit");
        assert!(!explicit.llm_enabled);
    }

    #[test]
    fn rejects_zero_and_out_of_range_values() {
        assert!(Cli::try_parse_from(["tfia-action-server", "--max-upload-bytes", "0"]).is_err());
        assert!(Cli::try_parse_from(["tfia-action-server", "--llm-max-tokens", "0"]).is_err());
        assert!(Cli::try_parse_from(["tfia-action-server", "--llm-temperature", "3.5"]).is_err());
        assert!(
            Cli::try_parse_from(["tfia-action-server", "--llm-request-timeout-ms", "abc"]).is_err()
        );
    }
}
