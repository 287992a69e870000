//! Background processors.
//!
//! - `StaleOrderSweeper`: settles `redirected` orders nobody came back for

pub mod stale_order_sweeper;

pub use stale_order_sweeper::{StaleOrderSweeper, SweepReport};
