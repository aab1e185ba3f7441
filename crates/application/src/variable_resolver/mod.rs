//! Variable resolution module
//!
//! Parses and substitutes `{{ name }}` placeholders across a request draft.
//!
//! # Usage
//!
//! ```
//! use courier_application::variable_resolver::VariableResolver;
//! use courier_domain::VariableMap;
//!
//! let mut vars = VariableMap::new();
//! vars.insert("host".to_string(), "localhost".to_string());
//!
//! let resolver = VariableResolver::new(vars);
//! assert_eq!(resolver.substitute("http://{{host}}/{{path}}"), "http://localhost/{{path}}");
//! ```

pub mod engine;
pub mod parser;

pub use engine::{VariableResolver, merge_variables};
pub use parser::{VariableReference, parse_variables};
