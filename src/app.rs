use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, http::HeaderValue, routing::get, Router};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::handlers;
use crate::journal::{JournalService, JournalStore};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub journal: JournalService,
    pub default_list_limit: i64,
    pub max_list_limit: i64,
}

impl AppState {
    pub fn new(store: Arc<dyn JournalStore>, config: &AppConfig) -> Self {
        Self {
            journal: JournalService::new(store),
            default_list_limit: config.journal.default_list_limit,
            max_list_limit: config.journal.max_list_limit,
        }
    }
}

pub fn app(state: AppState, config: &AppConfig) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(handlers::system::root))
        .route("/health", get(handlers::system::health))
        .merge(journal_routes())
        .layer(DefaultBodyLimit::max(config.server.max_request_size_bytes));

    if config.security.enable_cors {
        router = router.layer(cors_layer(&config.security.cors_origins));
    }
    if config.server.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn journal_routes() -> Router<AppState> {
    use axum::routing::post;
    use handlers::journal;

    Router::new()
        .route(
            "/api/investment/tradingjournal",
            get(journal::entry_list).post(journal::entry_create),
        )
        .route(
            "/api/investment/tradingjournal/summary/:date",
            get(journal::day_summary),
        )
        .route(
            "/api/investment/tradingjournal/resequence",
            post(journal::group_resequence),
        )
        .route(
            "/api/investment/tradingjournal/:id",
            get(journal::entry_show)
                .put(journal::entry_update)
                .patch(journal::entry_update)
                .delete(journal::entry_delete),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
