//! Vendor platform definitions.

pub mod arista_eos;
