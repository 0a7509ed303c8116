use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::TemplateError;
use crate::slug::slug;

/// Parsed form of one `{...}` block inside an ID template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Expr {
    Field(String),
    Slug(String),
    Or(Box<Expr>, Box<Expr>),
    Concat(Vec<Expr>),
}

impl Expr {
    fn eval(&self, row: &BTreeMap<String, String>) -> String {
        match self {
            Expr::Field(name) => row.get(name).cloned().unwrap_or_default(),
            Expr::Slug(name) => slug(row.get(name).map(String::as_str).unwrap_or("")),
            Expr::Or(left, right) => {
                let l = left.eval(row);
                if !l.is_empty() {
                    l
                } else {
                    right.eval(row)
                }
            }
            Expr::Concat(parts) => parts
                .iter()
                .map(|p| p.eval(row))
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("_"),
        }
    }
}

/// One compiled `id_template` string: literal segments interleaved with
/// `{...}` expression blocks, e.g. `partner_{slug(email) or slug(name)}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdTemplate {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Expr(Expr),
}

impl IdTemplate {
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.char_indices().peekable();

        while let Some(&(idx, ch)) = chars.peek() {
            if ch == '{' {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                chars.next();
                let expr = parse_expr(&mut chars)?;
                match chars.next() {
                    Some((_, '}')) => {}
                    _ => {
                        return Err(TemplateError::Expected {
                            expected: '}',
                            position: idx,
                        })
                    }
                }
                segments.push(Segment::Expr(expr));
            } else {
                literal.push(ch);
                chars.next();
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// Evaluate the template against one row, without truncation or dedup.
    fn render(&self, row: &BTreeMap<String, String>) -> String {
        self.segments
            .iter()
            .map(|seg| match seg {
                Segment::Literal(text) => text.clone(),
                Segment::Expr(expr) => expr.eval(row),
            })
            .collect()
    }

    /// Render the base external ID for one row, truncated to 60 characters
    /// (leaving room for a `_N` dedup suffix). Does not consult or update a
    /// [`crate::DedupTracker`] — callers append the suffix themselves.
    pub fn render_base_id(&self, row: &BTreeMap<String, String>) -> String {
        let rendered = self.render(row);
        rendered.chars().take(60).collect::<String>()
    }
}

type Chars<'a> = Peekable<CharIndices<'a>>;

fn parse_expr(chars: &mut Chars) -> Result<Expr, TemplateError> {
    let mut left = parse_atom(chars)?;
    loop {
        skip_ws(chars);
        if peek_keyword(chars, "or") {
            consume_keyword(chars, "or");
            skip_ws(chars);
            let right = parse_atom(chars)?;
            left = Expr::Or(Box::new(left), Box::new(right));
        } else {
            break;
        }
    }
    Ok(left)
}

fn parse_atom(chars: &mut Chars) -> Result<Expr, TemplateError> {
    skip_ws(chars);
    let ident = read_ident(chars);
    skip_ws(chars);

    if matches!(chars.peek(), Some((_, '('))) {
        chars.next();
        let expr = match ident.as_str() {
            "slug" => {
                skip_ws(chars);
                let field = read_ident(chars);
                skip_ws(chars);
                Expr::Slug(field)
            }
            "concat" => {
                let mut args = vec![parse_expr(chars)?];
                skip_ws(chars);
                while matches!(chars.peek(), Some((_, ','))) {
                    chars.next();
                    args.push(parse_expr(chars)?);
                    skip_ws(chars);
                }
                Expr::Concat(args)
            }
            other => return Err(TemplateError::UnknownFunction(other.to_string())),
        };
        skip_ws(chars);
        match chars.next() {
            Some((_, ')')) => Ok(expr),
            Some((idx, _)) => Err(TemplateError::Expected {
                expected: ')',
                position: idx,
            }),
            None => Err(TemplateError::UnexpectedEnd),
        }
    } else {
        Ok(Expr::Field(ident))
    }
}

fn read_ident(chars: &mut Chars) -> String {
    let mut ident = String::new();
    while let Some(&(_, ch)) = chars.peek() {
        if ch.is_whitespace() || matches!(ch, '(' | ')' | ',') {
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

fn peek_keyword(chars: &Chars, keyword: &str) -> bool {
    let remainder: String = chars.clone().map(|(_, c)| c).collect();
    remainder.starts_with(keyword)
        && remainder[keyword.len()..]
            .chars()
            .next()
            .map(|c| c.is_whitespace())
            .unwrap_or(true)
}

fn consume_keyword(chars: &mut Chars, keyword: &str) {
    for _ in keyword.chars() {
        chars.next();
    }
}
