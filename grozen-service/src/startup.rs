//! Application startup and lifecycle management.

use crate::config::{GrozenConfig, ProviderKind};
use crate::handlers;
use crate::middleware::auth::TokenVerifier;
use crate::middleware::{admin_middleware, auth_middleware, metrics_middleware};
use crate::services::metrics::init_metrics;
use crate::services::providers::gemini::{GeminiConfig, GeminiImageProvider, GeminiTextProvider};
use crate::services::providers::mock::{MockImageProvider, MockTextProvider};
use crate::services::providers::{ImageProvider, ProviderError, TextProvider};
use crate::services::{GrozenDb, PlanContexts, PlanStore};
use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{http_trace_layer, request_id_middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;

/// Selfies arrive inline as data URIs.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: GrozenConfig,
    pub db: GrozenDb,
    pub text_provider: Arc<dyn TextProvider>,
    pub image_provider: Arc<dyn ImageProvider>,
    pub plan_contexts: PlanContexts,
    pub verifier: TokenVerifier,
}

fn build_providers(
    config: &GrozenConfig,
) -> Result<(Arc<dyn TextProvider>, Arc<dyn ImageProvider>), ProviderError> {
    match config.models.provider {
        ProviderKind::Gemini => {
            let text = GeminiTextProvider::new(GeminiConfig {
                api_key: config.google.api_key.clone(),
                model: config.models.text_model.clone(),
            })?;
            let image = GeminiImageProvider::new(GeminiConfig {
                api_key: config.google.api_key.clone(),
                model: config.models.image_model.clone(),
            })?;
            tracing::info!(
                text_model = %config.models.text_model,
                image_model = %config.models.image_model,
                "Initialized Gemini providers"
            );
            Ok((Arc::new(text), Arc::new(image)))
        }
        ProviderKind::Mock => {
            tracing::warn!("Using mock model providers");
            Ok((
                Arc::new(MockTextProvider::new(true)),
                Arc::new(MockImageProvider::new(true)),
            ))
        }
    }
}

/// All routes with their middleware stack.
pub fn build_router(state: AppState) -> Router {
    // Admin routes
    let admin_routes = Router::new()
        .route("/v1/admin/users", get(handlers::admin::list_users))
        .route(
            "/v1/admin/users/:user_id",
            get(handlers::admin::get_user_detail),
        )
        .layer(from_fn_with_state(state.clone(), admin_middleware));

    // Everything under /v1 needs a verified ID token
    let api_routes = Router::new()
        .route(
            "/v1/users/me",
            get(handlers::users::get_me).post(handlers::users::sync_me),
        )
        .route(
            "/v1/plan",
            get(handlers::plan::get_plan).delete(handlers::plan::clear_plan),
        )
        .route(
            "/v1/plan/onboarding",
            put(handlers::plan::complete_onboarding),
        )
        .route("/v1/plan/generate", post(handlers::plan::generate_plan))
        .route(
            "/v1/moods",
            get(handlers::moods::list_moods).post(handlers::moods::log_mood),
        )
        .route(
            "/v1/grocery-list",
            get(handlers::grocery::get_grocery_list)
                .post(handlers::grocery::generate_grocery_list),
        )
        .route("/v1/schedule", post(handlers::schedule::generate_schedule))
        .route("/v1/schedule/:date", get(handlers::schedule::get_schedule))
        .route(
            "/v1/schedule/:date/quests/:quest_id/complete",
            post(handlers::schedule::complete_quest),
        )
        .route(
            "/v1/share-image",
            post(handlers::share_image::create_share_image),
        )
        .route(
            "/v1/face-validation",
            post(handlers::face_validation::check_face),
        )
        .route(
            "/v1/leaderboard",
            get(handlers::leaderboard::get_leaderboard),
        )
        .merge(admin_routes)
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .merge(api_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(from_fn(metrics_middleware))
        .layer(http_trace_layer())
        .layer(from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: GrozenConfig) -> Result<Self, AppError> {
        init_metrics();

        // Connect to database
        let db = GrozenDb::connect(&config.mongodb.uri, &config.mongodb.database)
            .await
            .map_err(|e| {
                tracing::error!("Failed to connect to MongoDB: {}", e);
                e
            })?;

        db.initialize_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            e
        })?;

        let (text_provider, image_provider) = build_providers(&config).map_err(|e| {
            tracing::error!("Failed to initialize model providers: {}", e);
            AppError::ConfigError(anyhow::anyhow!(e.to_string()))
        })?;

        let store: Arc<dyn PlanStore> = Arc::new(db.clone());
        let state = AppState {
            verifier: TokenVerifier::new(&config.auth),
            plan_contexts: PlanContexts::new(store),
            config: config.clone(),
            db,
            text_provider,
            image_provider,
        };

        // Bind HTTP listener (port 0 = random port for testing)
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("GroZen service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &GrozenDb {
        &self.state.db
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);

        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                std::io::Error::other(format!("HTTP server error: {}", e))
            })
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
