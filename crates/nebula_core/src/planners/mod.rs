//! Pure logistics planners. Each one reads `GameState`/`GameContent` and
//! returns a plan of (actor, target) assignments; none of them mutate state
//! themselves — the orchestrator turns a plan into actual ship orders.

pub mod common;
pub mod contract;
pub mod logistics;
pub mod mine;
pub mod region;

pub use common::Assignment;
