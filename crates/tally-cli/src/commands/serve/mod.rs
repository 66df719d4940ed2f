mod shutdown;

use axum::Router;
use clap::Args;
use std::sync::Arc;
use tally_analytics_events::EventsPlugin;
use tally_analytics_funnels::FunnelsPlugin;
use tally_config::ServerConfig;
use tally_core::plugin::PluginManager;
use tally_database::DbConnection;
use tally_funnel_builder::{EditorOptions, FunnelBuilderPlugin};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use utoipa_swagger_ui::SwaggerUi;

pub use shutdown::shutdown_signal;

#[derive(Args)]
pub struct ServeCommand {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1:3000", env = "TALLY_ADDRESS")]
    pub address: String,

    /// Database connection URL
    #[arg(long, env = "TALLY_DATABASE_URL")]
    pub database_url: String,
}

impl ServeCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let config = Arc::new(ServerConfig::new(self.address, self.database_url)?);

        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(serve(config))
    }
}

/// Register core services and plugins, in dependency order.
pub async fn build_plugin_manager(
    db: Arc<DbConnection>,
    config: &ServerConfig,
) -> anyhow::Result<PluginManager> {
    let mut plugin_manager = PluginManager::new();

    let limits = config.editor_limits();
    plugin_manager.service_context().register_service(db);
    plugin_manager
        .service_context()
        .register_service(Arc::new(EditorOptions {
            max_keywords: limits.max_keywords,
            max_steps: limits.max_steps,
        }));

    plugin_manager.register_plugin(Box::new(EventsPlugin));
    plugin_manager.register_plugin(Box::new(FunnelsPlugin));
    plugin_manager.register_plugin(Box::new(FunnelBuilderPlugin));

    plugin_manager
        .initialize_plugins()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize plugins: {}", e))?;

    debug!("Initialized plugins: {:?}", plugin_manager.plugin_names());
    Ok(plugin_manager)
}

fn create_swagger_router(plugin_manager: &PluginManager) -> anyhow::Result<Router> {
    let api_doc = plugin_manager
        .get_unified_openapi()
        .map_err(|e| anyhow::anyhow!("Failed to build unified OpenAPI schema: {}", e))?;
    Ok(Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api/openapi.json", api_doc)))
}

/// Full application: plugin routes under `/api`, Swagger UI and request tracing.
pub fn build_router(plugin_manager: &PluginManager) -> anyhow::Result<Router> {
    Ok(plugin_manager
        .build_application()
        .merge(create_swagger_router(plugin_manager)?)
        .layer(TraceLayer::new_for_http()))
}

async fn serve(config: Arc<ServerConfig>) -> anyhow::Result<()> {
    debug!("Initializing database connection...");
    let db = tally_database::establish_connection(&config.database_config()).await?;

    let plugin_manager = build_plugin_manager(db.clone(), &config).await?;
    let app = build_router(&plugin_manager)?;
    drop(plugin_manager);

    let listener = TcpListener::bind(&config.address).await?;
    info!("Tally API listening on {}", config.address);
    info!("Swagger UI available at http://{}/swagger-ui", config.address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown::close_database(db).await;
    info!("Tally API server exited");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tally_database::test_utils::TestDatabase;
    use tower::ServiceExt;

    fn config() -> ServerConfig {
        ServerConfig::with_lookup(
            "127.0.0.1:0".to_string(),
            "sqlite::memory:".to_string(),
            |key| match key {
                "TALLY_MAX_STEPS" => Some("5".to_string()),
                _ => None,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_router_serves_openapi_and_limits() {
        let test_db = TestDatabase::new().await.unwrap();
        let manager = build_plugin_manager(test_db.connection_arc(), &config())
            .await
            .unwrap();
        let app = build_router(&manager).unwrap();

        let response = app
            .clone()
            .oneshot(Request::get("/api/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(doc["paths"]["/funnels/{funnel_id}/conversion"].is_object());
        assert!(doc["paths"]["/funnel-templates"].is_object());

        let response = app
            .oneshot(
                Request::get("/api/funnel-step-types")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let catalog: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(catalog["limits"]["max_steps"], 5);
    }
}
