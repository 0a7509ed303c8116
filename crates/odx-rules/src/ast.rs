use std::collections::BTreeMap;

use crate::error::RuleError;

/// A literal value in the DSL: quoted string, bare `true`/`false`, or a
/// number. Numbers are kept as their source text for the purposes of this
/// engine — every result is ultimately cast to text for the output frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Bool(bool),
    Number(String),
}

/// Parsed rule expression tree. Grammar (see `parser::parse`):
///
/// ```text
/// ternary := or_expr ('?' or_expr ':' or_expr)?
/// or_expr := and_expr ('or' and_expr)*
/// and_expr := atom ('and' atom)*
/// atom := 'isset' '(' field ')'
///       | 'or' '(' value ',' value ')'      // coalesce, not infix `or`
///       | ident '==' literal
///       | '(' ternary ')'
///       | literal
///       | ident                              // bare field reference
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RuleExpr {
    IsSet(String),
    Eq(String, Literal),
    Coalesce(Box<RuleExpr>, Box<RuleExpr>),
    And(Box<RuleExpr>, Box<RuleExpr>),
    Or(Box<RuleExpr>, Box<RuleExpr>),
    Ternary(Box<RuleExpr>, Box<RuleExpr>, Box<RuleExpr>),
    Field(String),
    Literal(Literal),
}

/// Result of evaluating a [`RuleExpr`] against one row. Boolean results stay
/// typed until the caller decides to render them as text, so `and`/`or` can
/// reject a stray text operand instead of silently truthy-coercing it.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Text(Option<String>),
}

impl Value {
    fn to_bool(&self) -> Result<bool, RuleError> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Text(_) => Err(RuleError::NonBooleanOperand),
        }
    }

    /// Render as the text that would be written into the output frame.
    pub fn into_text(self) -> Option<String> {
        match self {
            Value::Bool(b) => Some(b.to_string()),
            Value::Text(t) => t,
        }
    }
}

impl RuleExpr {
    pub fn eval(&self, row: &BTreeMap<String, String>) -> Result<Value, RuleError> {
        match self {
            RuleExpr::IsSet(field) => Ok(Value::Bool(is_set(row, field))),
            RuleExpr::Eq(field, lit) => {
                let actual = row.get(field).map(String::as_str).unwrap_or("");
                Ok(Value::Bool(actual == literal_as_str(lit)))
            }
            RuleExpr::Coalesce(a, b) => {
                let left = a.eval(row)?.into_text();
                if left.as_deref().is_some_and(|s| !s.is_empty()) {
                    Ok(Value::Text(left))
                } else {
                    Ok(Value::Text(b.eval(row)?.into_text()))
                }
            }
            RuleExpr::And(a, b) => Ok(Value::Bool(a.eval(row)?.to_bool()? && b.eval(row)?.to_bool()?)),
            RuleExpr::Or(a, b) => Ok(Value::Bool(a.eval(row)?.to_bool()? || b.eval(row)?.to_bool()?)),
            RuleExpr::Ternary(cond, then_branch, else_branch) => {
                if cond.eval(row)?.to_bool()? {
                    then_branch.eval(row)
                } else {
                    else_branch.eval(row)
                }
            }
            RuleExpr::Field(name) => Ok(Value::Text(row.get(name).cloned())),
            RuleExpr::Literal(lit) => Ok(match lit {
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Str(s) => Value::Text(Some(s.clone())),
                Literal::Number(n) => Value::Text(Some(n.clone())),
            }),
        }
    }

    /// Collect every identifier this expression resolves against a row and
    /// check each is a known column. Called once per model before row
    /// iteration, per the "unknown identifiers are fatal" invariant.
    pub fn validate_identifiers(&self, known_columns: &[String]) -> Result<(), RuleError> {
        let mut idents = Vec::new();
        collect_identifiers(self, &mut idents);
        for ident in idents {
            if !known_columns.iter().any(|c| c == &ident) {
                return Err(RuleError::UnknownIdentifier(ident));
            }
        }
        Ok(())
    }
}

fn is_set(row: &BTreeMap<String, String>, field: &str) -> bool {
    row.get(field).is_some_and(|v| !v.is_empty())
}

fn literal_as_str(lit: &Literal) -> &str {
    match lit {
        Literal::Str(s) => s,
        Literal::Number(n) => n,
        Literal::Bool(b) => {
            if *b {
                "true"
            } else {
                "false"
            }
        }
    }
}

fn collect_identifiers(expr: &RuleExpr, out: &mut Vec<String>) {
    match expr {
        RuleExpr::IsSet(field) | RuleExpr::Eq(field, _) | RuleExpr::Field(field) => {
            out.push(field.clone())
        }
        RuleExpr::Coalesce(a, b) | RuleExpr::And(a, b) | RuleExpr::Or(a, b) => {
            collect_identifiers(a, out);
            collect_identifiers(b, out);
        }
        RuleExpr::Ternary(cond, t, e) => {
            collect_identifiers(cond, out);
            collect_identifiers(t, out);
            collect_identifiers(e, out);
        }
        RuleExpr::Literal(_) => {}
    }
}
