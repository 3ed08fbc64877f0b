// yamlscript - Variable and expression substitution for JSON and YAML documents
// Licensed under the MIT License

//! # yamlscript
//!
//! Resolves placeholders embedded in the strings of a structured document.
//!
//! - `${a.b.0}` is a variable: a dotted path into a context tree.
//! - `$(expr)` is an expression, evaluated against an [`Environment`] of
//!   functions and constants. Variables may appear inside expressions.
//! - `\$` escapes the sigil; the backslash is removed at the end.
//!
//! A string that is exactly one placeholder is replaced by the resolved value
//! with its own type. Placeholders surrounded by other text are spliced in as
//! text.
//!
//! ## Architecture
//!
//! - `span` - Balanced placeholder scanning and unescaping
//! - `pointer` - Pointer paths into value trees
//! - `substitute` - Variable resolution, expression spans, the tree walker
//! - `parser` - Expression parser (converts expression text to AST)
//! - `evaluator` - Expression evaluator (executes AST against an environment)
//! - `environment` - Expression namespaces and the `Globals` provider trait
//! - `functions` - Coercions and the built-in expression library
//! - `datetime` - Date, datetime and relative delta handling
//! - `signature` - Argument binding for native functions
//! - `loader` - JSON and YAML file loading
//! - `ast` - Abstract Syntax Tree definitions

pub mod ast;
pub mod datetime;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod loader;
pub mod parser;
pub mod pointer;
pub mod signature;
pub mod span;
pub mod substitute;
pub mod value;
mod utils;

pub use environment::{Environment, Globals};
pub use error::{Error, Result};
pub use evaluator::{Evaluator, EvaluatorError};
pub use functions::ExpressionGlobals;
pub use loader::{load, FileType, LoadError, LoadOptions};
pub use substitute::Substitution;
pub use value::Value;

/// Substitute every placeholder in a document using the default environment.
///
/// # Arguments
///
/// * `document` - The tree to rewrite; non-string leaves are kept as-is
/// * `context` - The tree variables are resolved against
///
/// # Errors
///
/// Fails on an unterminated span, an unresolvable variable, or an expression
/// that does not parse or raises.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use yamlscript::{sub, Value};
///
/// let document = Value::from(json!({"greeting": "Hello ${name}", "n": "$(len_of + 1)"}));
/// let context = Value::from(json!({"name": "James"}));
/// let result = sub(&document, &context);
/// assert!(result.is_err()); // `len_of` is not defined
///
/// let document = Value::from(json!({"greeting": "Hello ${name}", "n": "$(1 + 1)"}));
/// let result = sub(&document, &context).unwrap();
/// assert_eq!(result, Value::from(json!({"greeting": "Hello James", "n": 2})));
/// ```
pub fn sub(document: &Value, context: &Value) -> Result<Value> {
    substitute::substitute(document, context, &Environment::default())
}
