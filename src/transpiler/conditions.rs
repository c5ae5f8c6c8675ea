use crate::ast::*;
use super::ToSql;

/// Render predicates for WHERE.
pub trait ConditionToSql {
    /// The predicate, or `None` when nothing is constrained.
    fn to_condition_sql(&self) -> Option<String>;
}

impl ConditionToSql for Filter {
    /// Clauses under one filter are OR-joined.
    fn to_condition_sql(&self) -> Option<String> {
        let field = self.field().to_sql();
        let clauses: Vec<String> = self
            .clauses()
            .iter()
            .filter_map(|c| c.render(&field))
            .collect();

        match clauses.len() {
            0 => None,
            1 => clauses.into_iter().next(),
            _ => Some(format!("({})", clauses.join(" OR "))),
        }
    }
}

impl FilterClause {
    /// Render this clause against an already-rendered field.
    pub fn render(&self, field: &str) -> Option<String> {
        let values = self.values();
        if values.is_empty() {
            return None;
        }

        let rule = self.match_rule();
        match rule {
            MatchRule::Eq | MatchRule::Ne if values.len() == 1 => {
                Some(compare(field, rule, &values[0]))
            }
            MatchRule::Eq | MatchRule::Ne => {
                let list: Vec<String> = values.iter().map(|v| v.to_sql()).collect();
                let keyword = if rule == MatchRule::Eq { "IN" } else { "NOT IN" };
                Some(format!("{} {} ({})", field, keyword, list.join(", ")))
            }
            // NOT CONTAINS over several values means "contains none of them".
            MatchRule::Nc => Some(join_parts(
                values.iter().map(|v| compare(field, rule, v)).collect(),
                " AND ",
            )),
            _ => Some(join_parts(
                values.iter().map(|v| compare(field, rule, v)).collect(),
                " OR ",
            )),
        }
    }
}

fn compare(field: &str, rule: MatchRule, value: &ClauseValue) -> String {
    match (rule, value) {
        (MatchRule::Eq, ClauseValue::Literal(Value::Null)) => format!("{} IS NULL", field),
        (MatchRule::Ne, ClauseValue::Literal(Value::Null)) => format!("{} IS NOT NULL", field),
        (MatchRule::Nc, v) => format!("NOT {} CONTAINS {}", field, v.to_sql()),
        (rule, v) => format!("{} {} {}", field, rule.sql_symbol(), v.to_sql()),
    }
}

fn join_parts(parts: Vec<String>, joiner: &str) -> String {
    if parts.len() == 1 {
        parts.into_iter().next().unwrap_or_default()
    } else {
        format!("({})", parts.join(joiner))
    }
}
