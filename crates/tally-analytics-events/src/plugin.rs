use std::sync::Arc;
use tally_core::plugin::{
    PluginContext, PluginRoutes, RegistrationFuture, ServiceRegistrationContext, TallyPlugin,
};
use tracing::debug;

use crate::handlers::{self, AppState, EventsApiDoc};
use crate::services::EventsService;

/// Event store plugin
#[derive(Default)]
pub struct EventsPlugin;

impl TallyPlugin for EventsPlugin {
    fn name(&self) -> &'static str {
        "analytics-events"
    }

    fn register_services<'a>(
        &'a self,
        context: &'a ServiceRegistrationContext,
    ) -> RegistrationFuture<'a> {
        Box::pin(async move {
            let db = context.require_service::<sea_orm::DatabaseConnection>()?;

            let events_service = Arc::new(EventsService::new(db));
            context.register_service(events_service);

            debug!("Analytics events services registered successfully");
            Ok(())
        })
    }

    fn configure_routes(&self, context: &PluginContext) -> Option<PluginRoutes> {
        let events_service = context.get_service::<EventsService>()?;

        let routes = handlers::configure_routes().with_state(Arc::new(AppState { events_service }));

        Some(PluginRoutes::new(routes))
    }

    fn openapi_schema(&self) -> Option<utoipa::openapi::OpenApi> {
        Some(<EventsApiDoc as utoipa::OpenApi>::openapi())
    }
}
