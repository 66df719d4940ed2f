use async_trait::async_trait;
use tally_analytics_funnels::{CreateFunnelRequest, FunnelDefinition, FunnelError, FunnelService};

/// Destination for funnels produced by the editor
#[async_trait]
pub trait FunnelSink: Send + Sync {
    async fn create_funnel(
        &self,
        request: CreateFunnelRequest,
    ) -> Result<FunnelDefinition, FunnelError>;
}

#[async_trait]
impl FunnelSink for FunnelService {
    async fn create_funnel(
        &self,
        request: CreateFunnelRequest,
    ) -> Result<FunnelDefinition, FunnelError> {
        FunnelService::create_funnel(self, request).await
    }
}
