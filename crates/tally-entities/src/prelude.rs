pub use super::events::Entity as Events;
pub use super::funnel_steps::Entity as FunnelSteps;
pub use super::funnels::Entity as Funnels;
