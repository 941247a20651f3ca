//! Text-emitting tokens that make up where and order clauses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::text;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Fragment {
    /// Emitted verbatim: keywords, operators, numeric scalars
    Literal(String),
    /// Unquoted constant text; quoted when rendered
    Constant(String),
    Timestamp(DateTime<Utc>),
    NumberList(Vec<i32>),
    StringList(Vec<String>),
    /// Resolved field identifier
    FieldReference(String),
    GroupOpen,
    GroupClose,
    Compound(Vec<Fragment>),
}

impl Fragment {
    pub fn literal(text: impl Into<String>) -> Self {
        Fragment::Literal(text.into())
    }

    pub fn write_to(&self, out: &mut String) {
        match self {
            Fragment::Literal(t) | Fragment::FieldReference(t) => out.push_str(t),
            Fragment::Constant(t) => out.push_str(&text::quote(t)),
            Fragment::Timestamp(ts) => out.push_str(&text::quote(&text::format_timestamp(ts))),
            Fragment::NumberList(values) => {
                out.push('(');
                out.push_str(&text::concat(values, |v| v.to_string(), ", "));
                out.push(')');
            }
            Fragment::StringList(values) => {
                out.push('(');
                out.push_str(&text::concat(values, |v| text::quote(v), ", "));
                out.push(')');
            }
            Fragment::GroupOpen => out.push('('),
            Fragment::GroupClose => out.push(')'),
            Fragment::Compound(parts) => {
                for part in parts {
                    part.write_to(out);
                }
            }
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_scalar_encodings() {
        assert_eq!(Fragment::literal(" = ").render(), " = ");
        assert_eq!(Fragment::FieldReference("System.Id".into()).render(), "System.Id");
        assert_eq!(Fragment::Constant("Active".into()).render(), "'Active'");
        assert_eq!(Fragment::Constant(String::new()).render(), "''");

        let ts = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(Fragment::Timestamp(ts).render(), "'2023-12-31T23:59:59.000Z'");
    }

    #[test]
    fn test_list_encodings() {
        assert_eq!(Fragment::NumberList(vec![1, 2, 3]).render(), "(1, 2, 3)");
        assert_eq!(Fragment::NumberList(vec![]).render(), "()");
        assert_eq!(
            Fragment::StringList(vec!["Active".into(), "New's".into()]).render(),
            "('Active', 'New''s')"
        );
    }

    #[test]
    fn test_compound_concatenates_in_order() {
        let clause = Fragment::Compound(vec![
            Fragment::GroupOpen,
            Fragment::FieldReference("System.Priority".into()),
            Fragment::literal(" = "),
            Fragment::literal("1"),
            Fragment::GroupClose,
        ]);

        assert_eq!(clause.to_string(), "(System.Priority = 1)");
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(Fragment::FieldReference("System.Id".into())).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "FieldReference", "value": "System.Id" }));

        let json = serde_json::to_value(Fragment::GroupOpen).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "GroupOpen" }));
    }
}
