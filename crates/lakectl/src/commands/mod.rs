//! Command implementations

pub mod call;
pub mod ops;
pub mod profile;
