use std::iter::Peekable;
use std::str::CharIndices;

use crate::ast::{Literal, RuleExpr};
use crate::error::RuleError;

type Chars<'a> = Peekable<CharIndices<'a>>;

/// Parse one rule expression. This is a small recursive-descent parser, not
/// a general expression evaluator — the grammar is closed (see
/// [`crate::ast::RuleExpr`]'s doc comment) and there is no `eval`/arbitrary
/// execution path.
pub fn parse(rule: &str) -> Result<RuleExpr, RuleError> {
    let mut chars = rule.char_indices().peekable();
    let expr = parse_ternary(&mut chars)?;
    skip_ws(&mut chars);
    if let Some((idx, ch)) = chars.peek().copied() {
        return Err(RuleError::Parse {
            message: format!("unexpected trailing character '{ch}'"),
            position: idx,
        });
    }
    Ok(expr)
}

fn parse_ternary(chars: &mut Chars) -> Result<RuleExpr, RuleError> {
    let cond = parse_or(chars)?;
    skip_ws(chars);
    if matches!(chars.peek(), Some((_, '?'))) {
        chars.next();
        let then_branch = parse_or(chars)?;
        skip_ws(chars);
        expect_char(chars, ':')?;
        let else_branch = parse_or(chars)?;
        Ok(RuleExpr::Ternary(
            Box::new(cond),
            Box::new(then_branch),
            Box::new(else_branch),
        ))
    } else {
        Ok(cond)
    }
}

fn parse_or(chars: &mut Chars) -> Result<RuleExpr, RuleError> {
    let mut left = parse_and(chars)?;
    loop {
        skip_ws(chars);
        if peek_keyword(chars, "or") {
            consume_keyword(chars, "or");
            skip_ws(chars);
            let right = parse_and(chars)?;
            left = RuleExpr::Or(Box::new(left), Box::new(right));
        } else {
            break;
        }
    }
    Ok(left)
}

fn parse_and(chars: &mut Chars) -> Result<RuleExpr, RuleError> {
    let mut left = parse_atom(chars)?;
    loop {
        skip_ws(chars);
        if peek_keyword(chars, "and") {
            consume_keyword(chars, "and");
            skip_ws(chars);
            let right = parse_atom(chars)?;
            left = RuleExpr::And(Box::new(left), Box::new(right));
        } else {
            break;
        }
    }
    Ok(left)
}

fn parse_atom(chars: &mut Chars) -> Result<RuleExpr, RuleError> {
    skip_ws(chars);
    match chars.peek().copied() {
        Some((_, '(')) => {
            chars.next();
            let inner = parse_ternary(chars)?;
            skip_ws(chars);
            expect_char(chars, ')')?;
            Ok(inner)
        }
        Some((_, '\'')) | Some((_, '"')) => Ok(RuleExpr::Literal(Literal::Str(parse_string(chars)?))),
        Some((_, ch)) if ch.is_ascii_digit() || ch == '-' => {
            Ok(RuleExpr::Literal(Literal::Number(read_number(chars))))
        }
        Some((idx, _)) => {
            let ident = read_ident(chars);
            if ident.is_empty() {
                return Err(RuleError::Parse {
                    message: "expected an expression".to_string(),
                    position: idx,
                });
            }
            match ident.as_str() {
                "true" => Ok(RuleExpr::Literal(Literal::Bool(true))),
                "false" => Ok(RuleExpr::Literal(Literal::Bool(false))),
                "isset" if matches!(chars.peek(), Some((_, '('))) => {
                    chars.next();
                    skip_ws(chars);
                    let field = read_ident(chars);
                    skip_ws(chars);
                    expect_char(chars, ')')?;
                    Ok(RuleExpr::IsSet(field))
                }
                "or" if matches!(chars.peek(), Some((_, '('))) => {
                    chars.next();
                    skip_ws(chars);
                    let a = parse_atom(chars)?;
                    skip_ws(chars);
                    expect_char(chars, ',')?;
                    skip_ws(chars);
                    let b = parse_atom(chars)?;
                    skip_ws(chars);
                    expect_char(chars, ')')?;
                    Ok(RuleExpr::Coalesce(Box::new(a), Box::new(b)))
                }
                _ => {
                    skip_ws(chars);
                    if peek_eq(chars) {
                        chars.next();
                        chars.next();
                        skip_ws(chars);
                        let literal = match chars.peek().copied() {
                            Some((_, '\'')) | Some((_, '"')) => {
                                Literal::Str(parse_string(chars)?)
                            }
                            Some((_, ch)) if ch.is_ascii_digit() || ch == '-' => {
                                Literal::Number(read_number(chars))
                            }
                            Some((idx, _)) => {
                                return Err(RuleError::Parse {
                                    message: "expected a quoted literal after '=='".to_string(),
                                    position: idx,
                                })
                            }
                            None => return Err(RuleError::UnexpectedEnd),
                        };
                        Ok(RuleExpr::Eq(ident, literal))
                    } else {
                        Ok(RuleExpr::Field(ident))
                    }
                }
            }
        }
        None => Err(RuleError::UnexpectedEnd),
    }
}

fn parse_string(chars: &mut Chars) -> Result<String, RuleError> {
    let (_, quote) = chars.next().expect("caller checked quote char");
    let mut out = String::new();
    loop {
        match chars.next() {
            Some((_, ch)) if ch == quote => return Ok(out),
            Some((_, ch)) => out.push(ch),
            None => return Err(RuleError::UnexpectedEnd),
        }
    }
}

fn read_number(chars: &mut Chars) -> String {
    let mut out = String::new();
    if matches!(chars.peek(), Some((_, '-'))) {
        out.push('-');
        chars.next();
    }
    while let Some(&(_, ch)) = chars.peek() {
        if ch.is_ascii_digit() || ch == '.' {
            out.push(ch);
            chars.next();
        } else {
            break;
        }
    }
    out
}

fn read_ident(chars: &mut Chars) -> String {
    let mut ident = String::new();
    while let Some(&(_, ch)) = chars.peek() {
        if ch.is_whitespace() || matches!(ch, '(' | ')' | ',' | '?' | ':' | '=') {
            break;
        }
        ident.push(ch);
        chars.next();
    }
    ident
}

fn skip_ws(chars: &mut Chars) {
    while matches!(chars.peek(), Some((_, ch)) if ch.is_whitespace()) {
        chars.next();
    }
}

fn peek_eq(chars: &Chars) -> bool {
    let mut clone = chars.clone();
    matches!(clone.next(), Some((_, '='))) && matches!(clone.next(), Some((_, '=')))
}

fn peek_keyword(chars: &Chars, keyword: &str) -> bool {
    let remainder: String = chars.clone().map(|(_, c)| c).collect();
    remainder.starts_with(keyword)
        && remainder[keyword.len()..]
            .chars()
            .next()
            .map(|c| c.is_whitespace() || c == '(')
            .unwrap_or(true)
}

fn consume_keyword(chars: &mut Chars, keyword: &str) {
    for _ in keyword.chars() {
        chars.next();
    }
}

fn expect_char(chars: &mut Chars, expected: char) -> Result<(), RuleError> {
    match chars.next() {
        Some((_, ch)) if ch == expected => Ok(()),
        Some((idx, ch)) => Err(RuleError::Parse {
            message: format!("expected '{expected}', found '{ch}'"),
            position: idx,
        }),
        None => Err(RuleError::UnexpectedEnd),
    }
}
