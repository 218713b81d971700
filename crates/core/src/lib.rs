//! Domain core for the Touchline coaching platform.
//!
//! Pure types, geometry and validation with no I/O: the pitch-zone
//! geometry engine and editor state machine, feed filters and row
//! models carried by the realtime feeds, versioned payload migration,
//! and individual development plans.

pub mod coords;
pub mod error;
pub mod feed;
pub mod idp;
pub mod media;
pub mod models;
pub mod payload;
pub mod types;
pub mod zone;
pub mod zone_editor;
