//! Parsing and validation for `.ivy` configuration files.
//!
//! A `.ivy` file is a sectioned, line-oriented text format: `[section]`
//! headers introduce blocks of `key value` pairs (or, for `[file <path>]`,
//! raw body text up to the next header). See [`parse`] for the grammar and
//! [`Config`] for the validated result.

mod error;
mod parser;
mod types;

pub use error::{ConfigError, SrcLoc};
pub use parser::parse;
pub use types::{Config, EngineDirective, FileSection, Options};
