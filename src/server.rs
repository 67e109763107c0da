use crate::cli::ServeArgs;
use crate::routes::{with_collections_routes, AppState};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use collections_strategy::accounts::{
    load_accounts_from_path, CollectionsService, InMemoryAccountRepository,
};
use collections_strategy::config::{AppConfig, StrategyConfig};
use collections_strategy::error::AppError;
use collections_strategy::strategy::{RuleSet, StrategyDraft, StrategyGraph};
use collections_strategy::telemetry;
use std::fs::File;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

const STARTUP_TRIGGER: &str = "startup";

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let service = build_service(&config.strategy)?;

    let app = with_collections_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "collections strategy service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Builds the service from start-up files: optional rules, an optional
/// graph that becomes the active strategy, and optional seed accounts.
pub(crate) fn build_service(
    config: &StrategyConfig,
) -> Result<Arc<CollectionsService<InMemoryAccountRepository>>, AppError> {
    let rules = match &config.rules_path {
        Some(path) => {
            let rules = RuleSet::from_reader(File::open(path)?)?;
            if !rules.has_catch_all() {
                warn!(path = %path.display(), "rule set has no catch-all; unmatched accounts get the default review action");
            }
            rules
        }
        None => RuleSet::standard(),
    };

    let repository = Arc::new(InMemoryAccountRepository::default());
    let service = Arc::new(CollectionsService::new(repository, rules));

    if let Some(path) = &config.graph_path {
        let graph = StrategyGraph::from_path(path)?;
        for issue in graph.validate() {
            warn!(path = %path.display(), issue = %issue.summary(), "strategy graph issue");
        }
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("startup strategy")
            .to_string();
        let saved = service.save_strategy(
            StrategyDraft {
                id: None,
                name,
                description: format!("Loaded from {}", path.display()),
                graph,
                created_by: STARTUP_TRIGGER.to_string(),
            },
            STARTUP_TRIGGER,
        )?;
        service.activate_strategy(&saved.id, STARTUP_TRIGGER)?;
    }

    if let Some(path) = &config.accounts_seed_path {
        let accounts = load_accounts_from_path(path)?;
        service.load_accounts(accounts, STARTUP_TRIGGER)?;
    }

    Ok(service)
}
