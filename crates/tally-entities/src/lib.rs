//! SeaORM entities for the Tally schema

pub mod events;
pub mod funnel_steps;
pub mod funnels;

pub mod prelude;
