//! Platform definitions.
//!
//! This module defines vendor-specific CLI behavior: prompt and error
//! patterns, session setup commands and privilege transitions.

mod definition;
mod privilege;
pub mod vendors;

pub use definition::PlatformDefinition;
pub use privilege::{PrivilegeMode, is_config_context};
