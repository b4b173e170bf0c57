use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tfia_actions::{
    default_action_registry, ActionDependencies, CausePredictor, CdcarmCatalog, LlmCausePredictor,
};
use tfia_ai::{OpenAiAuthScheme, OpenAiClient, OpenAiConfig};
use tfia_cli::{Cli, CliLlmAuthScheme};
use tfia_gateway::ActionServerConfig;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const WEBHOOK_TO_UPLOAD_RATIO: usize = 8;

pub(crate) fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

pub(crate) fn load_cdcarm_catalog(cli: &Cli) -> Result<CdcarmCatalog> {
    let catalog = match cli.catalog.as_deref() {
        Some(path) => CdcarmCatalog::load(path)?,
        None => CdcarmCatalog::default(),
    };
    Ok(match cli.dashboard_origin.as_deref() {
        Some(origin) if !origin.trim().is_empty() => catalog.with_dashboard_origin(origin),
        _ => catalog,
    })
}

pub(crate) fn openai_auth_scheme(scheme: CliLlmAuthScheme) -> OpenAiAuthScheme {
    match scheme {
        CliLlmAuthScheme::Bearer => OpenAiAuthScheme::Bearer,
        CliLlmAuthScheme::ApiKeyHeader => OpenAiAuthScheme::ApiKeyHeader,
    }
}

pub(crate) fn build_cause_predictor(cli: &Cli) -> Result<Option<Arc<dyn CausePredictor>>> {
    if !cli.llm_enabled {
        return Ok(None);
    }
    let Some(api_key) = cli.llm_api_key.as_deref().filter(|key| !key.trim().is_empty()) else {
        bail!("--llm-enabled requires --llm-api-key (or TFIA_LLM_API_KEY)");
    };
    let client = OpenAiClient::new(OpenAiConfig {
        api_base: cli.llm_api_base.clone(),
        api_key: api_key.to_string(),
        request_timeout_ms: cli.llm_request_timeout_ms,
        max_retries: cli.llm_max_retries,
        retry_budget_ms: cli.llm_retry_budget_ms,
        retry_jitter: true,
        auth_scheme: openai_auth_scheme(cli.llm_auth_scheme),
    })
    .context("failed to create chat-completions client")?;
    let predictor = LlmCausePredictor::new(
        Arc::new(client),
        cli.llm_model.clone(),
        cli.llm_max_tokens,
        cli.llm_temperature,
    )?;
    info!(model = %cli.llm_model, api_base = %cli.llm_api_base, "failure cause prediction enabled");
    let predictor: Arc<dyn CausePredictor> = Arc::new(predictor);
    Ok(Some(predictor))
}

/// Trackers echo the stored analysis of an accepted upload back on every
/// call, and its JSON form is several times the raw table size.
pub(crate) fn webhook_body_limit(cli: &Cli) -> usize {
    cli.max_webhook_bytes
        .max(cli.max_upload_bytes.saturating_mul(WEBHOOK_TO_UPLOAD_RATIO))
}

pub(crate) fn build_action_server_config(cli: &Cli) -> Result<ActionServerConfig> {
    let catalog = load_cdcarm_catalog(cli)?;
    let mut dependencies = ActionDependencies::new(catalog);
    if let Some(predictor) = build_cause_predictor(cli)? {
        dependencies = dependencies.with_predictor(predictor);
    }
    Ok(ActionServerConfig {
        bind: cli.bind.clone(),
        upload_dir: cli.upload_dir.clone(),
        max_upload_bytes: cli.max_upload_bytes,
        max_webhook_bytes: webhook_body_limit(cli),
        registry: Arc::new(default_action_registry(&dependencies)),
    })
}
