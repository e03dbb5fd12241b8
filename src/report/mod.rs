//! Result export for downstream reporting tools

pub mod csv;
pub mod json;
