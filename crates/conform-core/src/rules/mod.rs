pub mod catalog;
pub mod classify;
pub mod eval;
pub mod manifest;
pub mod parser;
pub mod severity;
