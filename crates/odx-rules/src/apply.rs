use odx_frame::TabularFrame;

use crate::ast::RuleExpr;
use crate::error::RuleError;
use crate::parser;

/// One field's default/rule pair, pre-parsed and ready to apply to a frame.
/// Built by the caller from a model's field specs — this crate has no
/// dependency on the registry's types, mirroring `odx-normalize`'s leaf
/// position in the dependency graph.
pub struct FieldRule {
    pub field: String,
    pub default: Option<String>,
    pub rule: Option<RuleExpr>,
}

impl FieldRule {
    /// Parse `rule_source` (if any) up front so parse errors surface at
    /// registry-load time rather than mid-export.
    pub fn new(field: impl Into<String>, default: Option<String>, rule_source: Option<&str>) -> Result<Self, RuleError> {
        let rule = rule_source.map(parser::parse).transpose()?;
        Ok(Self {
            field: field.into(),
            default,
            rule,
        })
    }
}

/// Apply defaults then rule expressions to `frame`, in field order:
/// each field with a `default` is null-filled first, then each field with a
/// `rule` has its column computed (added or overwritten). Identifiers are
/// validated against the frame's schema once, before any row is evaluated.
pub fn apply_field_rules(frame: &mut TabularFrame, rules: &[FieldRule]) -> Result<(), RuleError> {
    for field_rule in rules {
        if let Some(default) = &field_rule.default {
            if frame.has_column(&field_rule.field) {
                frame.fill_null(&field_rule.field, default);
            }
        }
    }

    for field_rule in rules {
        let Some(expr) = &field_rule.rule else { continue };
        let known_columns = frame.columns().to_vec();
        expr.validate_identifiers(&known_columns)?;

        let mut values = Vec::with_capacity(frame.len());
        for row in frame.iter_rows_named() {
            values.push(expr.eval(&row)?.into_text());
        }
        frame.with_column(&field_rule.field, values);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use odx_frame::TabularFrame;

    fn frame_with(headers: &[&str], rows: &[Vec<Option<&str>>]) -> TabularFrame {
        let headers: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
        let rows: Vec<Vec<Option<String>>> = rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.map(str::to_string)).collect())
            .collect();
        TabularFrame::from_rows(headers, rows)
    }

    #[test]
    fn default_fills_only_null_cells() {
        let mut frame = frame_with(&["country"], &[vec![None], vec![Some("FR")]]);
        let rules = vec![FieldRule::new("country", Some("US".to_string()), None).unwrap()];
        apply_field_rules(&mut frame, &rules).unwrap();
        assert_eq!(frame.get("country", 0), Some("US"));
        assert_eq!(frame.get("country", 1), Some("FR"));
    }

    #[test]
    fn rule_adds_a_derived_column() {
        let mut frame = frame_with(
            &["stage_id/id", "lost_reason_id/id"],
            &[vec![Some("stage_won"), None], vec![Some("stage_open"), Some("lost_spam")]],
        );
        let rule = "isset(stage_id/id) and (stage_id/id == 'stage_won' or isset(lost_reason_id/id)) ? false : true";
        let rules = vec![FieldRule::new("active", None, Some(rule)).unwrap()];
        apply_field_rules(&mut frame, &rules).unwrap();
        assert_eq!(frame.get("active", 0), Some("false"));
        assert_eq!(frame.get("active", 1), Some("false"));
    }

    #[test]
    fn unknown_identifier_fails_before_any_row_is_evaluated() {
        let mut frame = frame_with(&["email"], &[vec![Some("a@b.com")]]);
        let rules = vec![FieldRule::new("x", None, Some("isset(phone)")).unwrap()];
        assert!(apply_field_rules(&mut frame, &rules).is_err());
    }
}
