use std::sync::Arc;
use tally_analytics_funnels::FunnelService;
use tally_core::plugin::{
    PluginContext, PluginRoutes, RegistrationFuture, ServiceRegistrationContext, TallyPlugin,
};
use tracing::debug;

use crate::editor::EditorOptions;
use crate::handlers::{self, AppState, BuilderApiDoc};

/// Step catalogue, templates and draft saving.
///
/// Must be registered after the funnels plugin. Uses the registered
/// `EditorOptions` when present, defaults otherwise.
#[derive(Default)]
pub struct FunnelBuilderPlugin;

impl TallyPlugin for FunnelBuilderPlugin {
    fn name(&self) -> &'static str {
        "funnel-builder"
    }

    fn register_services<'a>(
        &'a self,
        context: &'a ServiceRegistrationContext,
    ) -> RegistrationFuture<'a> {
        Box::pin(async move {
            context.require_service::<FunnelService>()?;

            if context.get_service::<EditorOptions>().is_none() {
                context.register_service(Arc::new(EditorOptions::default()));
            }

            debug!("Funnel builder services registered successfully");
            Ok(())
        })
    }

    fn configure_routes(&self, context: &PluginContext) -> Option<PluginRoutes> {
        let options = context.get_service::<EditorOptions>()?;
        let funnel_service = context.get_service::<FunnelService>()?;

        let routes = handlers::configure_routes()
            .with_state(Arc::new(AppState::new(*options, funnel_service)));

        Some(PluginRoutes::new(routes))
    }

    fn openapi_schema(&self) -> Option<utoipa::openapi::OpenApi> {
        Some(<BuilderApiDoc as utoipa::OpenApi>::openapi())
    }
}
