use std::sync::Arc;
use tally_analytics_events::EventsService;
use tally_core::plugin::{
    PluginContext, PluginRoutes, RegistrationFuture, ServiceRegistrationContext, TallyPlugin,
};
use tracing::debug;

use crate::handlers::{self, AppState, FunnelApiDoc};
use crate::services::{ConversionService, FunnelService};

/// Funnel store and conversion engine plugin.
///
/// Must be registered after the events plugin.
#[derive(Default)]
pub struct FunnelsPlugin;

impl TallyPlugin for FunnelsPlugin {
    fn name(&self) -> &'static str {
        "funnels"
    }

    fn register_services<'a>(
        &'a self,
        context: &'a ServiceRegistrationContext,
    ) -> RegistrationFuture<'a> {
        Box::pin(async move {
            debug!("Registering funnels services");

            let db = context.require_service::<sea_orm::DatabaseConnection>()?;
            let events_service = context.require_service::<EventsService>()?;

            let funnel_service = Arc::new(FunnelService::new(db));
            let conversion_service = Arc::new(ConversionService::new(
                funnel_service.clone(),
                events_service,
            ));

            context.register_service(funnel_service);
            context.register_service(conversion_service);

            debug!("Funnels services registered successfully");
            Ok(())
        })
    }

    fn configure_routes(&self, context: &PluginContext) -> Option<PluginRoutes> {
        let funnel_service = context.get_service::<FunnelService>()?;
        let conversion_service = context.get_service::<ConversionService>()?;

        let routes = handlers::configure_routes().with_state(Arc::new(AppState {
            funnel_service,
            conversion_service,
        }));

        Some(PluginRoutes::new(routes))
    }

    fn openapi_schema(&self) -> Option<utoipa::openapi::OpenApi> {
        Some(<FunnelApiDoc as utoipa::OpenApi>::openapi())
    }
}
