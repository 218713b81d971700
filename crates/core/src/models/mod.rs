//! Rows carried by the realtime feeds.

pub mod methodology;
pub mod rule;
pub mod session;

pub use methodology::{MethodologyPatch, TrainingMethodology};
pub use rule::{Rule, RuleCategory, RulePatch};
pub use session::{SessionPatch, TrainingSession};
