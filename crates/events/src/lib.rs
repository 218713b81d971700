//! Touchline change-notification bus.
//!
//! Stores publish a [`ChangeEvent`] for every row they write; change
//! channels read them back through a [`ChangeBus`] subscription.

pub mod bus;

pub use bus::{ChangeBus, ChangeEvent, ChangeKind};
