//! Matching: which files a migration visits and which nodes a rule touches.

pub mod ast;
pub mod file;

pub use ast::{Capture, Pattern, QueryMatch};
pub use file::FileMatcher;
