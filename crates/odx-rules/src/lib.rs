//! Restricted rule DSL for registry-defined derived fields: `isset(field)`,
//! `field == 'literal'`, `or(a,b)` coalesce, `cond ? a : b` ternary, composed
//! with `and`/`or` and parentheses. No `eval`/arbitrary execution.

mod apply;
mod ast;
mod error;
mod parser;

pub use apply::{apply_field_rules, FieldRule};
pub use ast::{Literal, RuleExpr, Value};
pub use error::RuleError;
pub use parser::parse;
