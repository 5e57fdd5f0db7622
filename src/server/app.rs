use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{delete, get},
    Router,
};
use sea_orm::DatabaseConnection;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use super::handlers::{default_layers, health, layer_groups, layers, projects};
use super::middleware::{api_version, error_envelope};
use crate::cache::ResponseCache;
use crate::config::ServerConfig;
use crate::health::HealthService;
use crate::services::{
    CatalogQuery, DefaultLayerService, LayerGroupService, LayerService, ProjectService,
};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<ServerConfig>,
    pub cache: Arc<ResponseCache>,
    pub health: HealthService,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: ServerConfig) -> Result<Self> {
        let cache = Arc::new(ResponseCache::default());
        let health = HealthService::with_defaults(db.clone(), cache.clone(), &config.health)?;
        Ok(Self {
            db,
            config: Arc::new(config),
            cache,
            health,
        })
    }

    pub fn projects(&self) -> ProjectService {
        ProjectService::new(self.db.clone())
    }

    pub fn groups(&self) -> LayerGroupService {
        LayerGroupService::new(self.db.clone())
    }

    pub fn layers(&self) -> LayerService {
        LayerService::new(self.db.clone())
    }

    pub fn default_layers(&self) -> DefaultLayerService {
        DefaultLayerService::new(self.db.clone())
    }

    pub fn catalog(&self) -> CatalogQuery {
        CatalogQuery::new(self.db.clone())
    }
}

pub async fn create_app(db: DatabaseConnection, config: ServerConfig) -> Result<Router> {
    router(AppState::new(db, config)?)
}

/// Build the full router around a prepared state.
pub fn router(state: AppState) -> Result<Router> {
    let cors = match state.config.cors_origin.as_deref() {
        Some(origin) => CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<HeaderValue>()
                    .with_context(|| format!("Invalid CORS origin: {}", origin))?,
            )
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };
    let max_body_bytes = state.config.max_body_bytes;

    let app = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/simple", get(health::health_check_simple))
        .route("/health/ready", get(health::readiness_check))
        .route("/health/live", get(health::liveness_check))
        .nest("/api/v1", api_v1_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(middleware::from_fn(error_envelope))
                .layer(middleware::from_fn(api_version))
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(max_body_bytes)),
        )
        .with_state(state);

    Ok(app)
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Projects
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/projects/:id",
            get(projects::get_project)
                .put(projects::replace_project)
                .patch(projects::update_project)
                .delete(projects::delete_project),
        )
        .route("/projects/by-name/:short_key", get(projects::get_project_by_short_key))
        .route("/projects/:id/layer-groups", get(projects::list_project_groups))
        .route("/projects/:id/layers", get(projects::list_project_layers))
        .route("/projects/:id/eligible-parents", get(projects::eligible_parents))
        .route(
            "/projects/:id/default-layers",
            get(default_layers::list_default_layers).post(default_layers::create_default_layer),
        )
        .route("/default-layers/:id", delete(default_layers::delete_default_layer))
        // Layer groups
        .route(
            "/layer-groups",
            get(layer_groups::list_groups).post(layer_groups::create_group),
        )
        .route(
            "/layer-groups/:id",
            get(layer_groups::get_group)
                .put(layer_groups::replace_group)
                .patch(layer_groups::update_group)
                .delete(layer_groups::delete_group),
        )
        // Layers
        .route("/layers", get(layers::list_layers).post(layers::create_layer))
        .route(
            "/layers/:id",
            get(layers::get_layer)
                .put(layers::replace_layer)
                .patch(layers::update_layer)
                .delete(layers::delete_layer),
        )
}
