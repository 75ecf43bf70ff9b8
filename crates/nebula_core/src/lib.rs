//! `nebula_core` — deterministic simulation engine for Nebula4X.
//!
//! No IO, no network. All randomness flows through a passed-in `rand::Rng`.
//! The sole mutating entry point is [`tick`].

pub mod combat;
pub mod content;
pub mod contracts_tick;
pub mod diplomacy;
pub mod economy;
pub mod engine;
pub mod exploration;
mod id;
pub mod intercept;
pub mod metrics;
pub mod order_exec;
pub mod orders;
pub mod planners;
pub mod research;
pub mod routing;
pub mod state;
mod vec2;
pub mod validator;
pub mod victory;

pub use content::*;
pub use engine::{tick, SimConfig, TickOutcome};
pub use id::{generate_uuid, Id, IdAllocator};
pub use metrics::{compute_metrics, MetricsSnapshot};
pub use orders::*;
pub use state::*;
pub use vec2::Vec2;

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;
