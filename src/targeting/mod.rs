//! Targeting: requirements, legality and default selection

pub mod auto_select;
pub mod requirement;
pub mod validity;

pub use auto_select::auto_select_targets;
pub use requirement::{build_requirements, Requirement};
pub use validity::{is_target_valid, legal_targets, PendingContext};
