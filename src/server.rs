//! # Server Configuration
//!
//! This module contains the application state, router construction, and the
//! server entry point for the Faultline API.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::auth_middleware;
use crate::config::AppConfig;
use crate::connectors::ConnectorRegistry;
use crate::db::init_pool;
use crate::handlers;
use crate::repositories::DlqRepository;
use crate::scheduler::IngestScheduler;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub registry: Arc<ConnectorRegistry>,
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/api/investigations",
            post(handlers::investigations::create_investigation)
                .get(handlers::investigations::list_investigations),
        )
        .route(
            "/api/investigations/{id}",
            get(handlers::investigations::get_investigation)
                .patch(handlers::investigations::update_investigation)
                .delete(handlers::investigations::delete_investigation),
        )
        .route(
            "/api/investigations/{id}/related",
            post(handlers::investigations::relate_investigation),
        )
        .route(
            "/api/investigations/{id}/annotations",
            post(handlers::investigations::create_annotation)
                .get(handlers::investigations::list_annotations),
        )
        .route(
            "/api/investigations/{id}/events",
            get(handlers::links::linked_events),
        )
        .route(
            "/api/investigations/{id}/events/link",
            post(handlers::links::link_event),
        )
        .route(
            "/api/investigations/{id}/events/auto-link",
            post(handlers::links::auto_link),
        )
        .route(
            "/api/investigations/{id}/events/suggestions",
            get(handlers::links::suggestions),
        )
        .route(
            "/api/events",
            get(handlers::events::list_events).post(handlers::events::create_event),
        )
        .route("/api/events/search", get(handlers::events::search_events))
        .route(
            "/api/connectors/status",
            get(handlers::connectors::connectors_status),
        )
        .route(
            "/api/connectors/{source}/collect",
            post(handlers::connectors::trigger_collect),
        )
        .route(
            "/api/connectors/{source}/dlq",
            get(handlers::connectors::dlq_list),
        )
        .route(
            "/api/connectors/{source}/dlq/{id}/retry",
            post(handlers::connectors::dlq_retry),
        )
        .route("/api/auth/revoke", post(handlers::tokens::revoke))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/", get(handlers::root))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given configuration
pub async fn run_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let db = init_pool(&config).await?;
    Migrator::up(&db, None).await?;

    let shutdown = CancellationToken::new();
    let dlq = DlqRepository::new(db.clone());
    let registry = Arc::new(ConnectorRegistry::from_config(
        &config,
        dlq,
        shutdown.clone(),
    ));

    info!(
        connectors = registry.len(),
        profile = %config.profile,
        "Connector registry initialized"
    );

    let state = AppState {
        config: Arc::new(config),
        db: db.clone(),
        registry: Arc::clone(&registry),
    };

    let scheduler = IngestScheduler::new(state.config.scheduler.clone(), db, registry);
    let ingest_handles = scheduler.spawn(shutdown.clone());

    let app = create_app(state.clone());

    let addr = state
        .config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    let shutdown_signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
            shutdown_signal.cancel();
        })
        .await?;

    shutdown.cancel();
    for handle in ingest_handles {
        let _ = handle.await;
    }

    Ok(())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::investigations::create_investigation,
        crate::handlers::investigations::list_investigations,
        crate::handlers::investigations::get_investigation,
        crate::handlers::investigations::update_investigation,
        crate::handlers::investigations::delete_investigation,
        crate::handlers::investigations::relate_investigation,
        crate::handlers::investigations::create_annotation,
        crate::handlers::investigations::list_annotations,
        crate::handlers::links::link_event,
        crate::handlers::links::auto_link,
        crate::handlers::links::linked_events,
        crate::handlers::links::suggestions,
        crate::handlers::events::list_events,
        crate::handlers::events::search_events,
        crate::handlers::events::create_event,
        crate::handlers::connectors::connectors_status,
        crate::handlers::connectors::trigger_collect,
        crate::handlers::connectors::dlq_list,
        crate::handlers::connectors::dlq_retry,
        crate::handlers::tokens::revoke,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::handlers::types::EventInfo,
            crate::handlers::types::InvestigationInfo,
            crate::handlers::types::AnnotationInfo,
            crate::handlers::types::DlqEntryInfo,
            crate::handlers::investigations::CreateInvestigationRequest,
            crate::handlers::investigations::UpdateInvestigationRequest,
            crate::handlers::investigations::InvestigationsResponse,
            crate::handlers::investigations::RelateRequest,
            crate::handlers::investigations::CreateAnnotationRequest,
            crate::handlers::links::LinkEventRequest,
            crate::handlers::links::LinkInfo,
            crate::handlers::links::AutoLinkResponse,
            crate::handlers::events::CreateEventRequest,
            crate::handlers::connectors::ConnectorStatusInfo,
            crate::handlers::connectors::ConnectorsStatusResponse,
            crate::handlers::tokens::RevokeTokenRequest,
            crate::connectors::CircuitState,
        )
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Faultline RCA Workspace API",
        description = "Root-cause-analysis workspace: signal ingestion, investigations, and event linking",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
