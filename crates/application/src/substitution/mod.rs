//! Placeholder substitution
//!
//! Finds `{{key}}` placeholders in text and replaces them with the values of
//! enabled variables. The grammar is fixed: the name between the braces uses
//! the same `[A-Za-z0-9_]` charset as a variable key, so anything else
//! (spaces, hyphens, unbalanced braces) is never matched and passes through.
//!
//! # Usage
//!
//! ```
//! use chrono::Utc;
//! use hostvar_application::substitution::replace_variables;
//! use hostvar_domain::{Variable, VariableDraft};
//!
//! let name = Variable::create("1", VariableDraft::new("NAME", "World"), Utc::now());
//! let result = replace_variables("Hello {{NAME}}", &[name]);
//! assert_eq!(result, "Hello World");
//! ```

pub mod engine;
pub mod parser;

pub use engine::{Substitution, replace_variables, substitute};
pub use parser::{Placeholder, find_placeholders, has_placeholders, placeholder_names};
