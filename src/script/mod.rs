//! Script parsing: the directive model and the two surface syntaxes.

/// Directive model shared by both syntaxes.
pub mod model;
/// Dual-syntax parser with parse-time structural validation.
pub mod parse;
