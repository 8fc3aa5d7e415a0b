//! Template engine module for chart rendering
//!
//! Implements the Go text/template dialect used by chart starters, with
//! configurable delimiters and a Sprig-style helper library.

pub mod error;
pub mod value;
pub mod functions;
pub mod engine;

mod ast;
mod exec;
mod lexer;
mod parser;

// Re-export public API
pub use engine::{Delimiters, MissingKey, Template, TemplateEngine};
pub use error::TemplateError;
pub use functions::{Arity, CaseTransform, FunctionRegistry, HelperFn};
pub use value::Value;
