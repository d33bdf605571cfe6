//! Blueprint annotation core: rooms and pins over a floor-plan image, the
//! pointer-driven editing state machine, editor popup placement, and the
//! bridge to a durable store.

pub mod blueprint;
pub mod bridge;
pub mod controller;
pub mod geometry;
pub mod logging;
pub mod model;
pub mod placement;
pub mod session;
pub mod stats;
pub mod store;
pub mod sync;
pub mod validation;
pub mod worker;
