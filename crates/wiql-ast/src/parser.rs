//! Pest-based parser for the WIQL pipeline language

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

use crate::ast::*;

/// Name of the lambda parameter predicates are built over
pub const PARAMETER: &str = "it";

#[derive(Parser)]
#[grammar = "wiql.pest"]
pub struct WiqlParser;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Invalid literal: {0}")]
    InvalidLiteral(String),

    #[error("Pest error: {0}")]
    Pest(#[from] pest::error::Error<Rule>),
}

/// Parse pipeline text into a query AST
pub fn parse(source: &str) -> Result<Expr, ParseError> {
    let mut pairs = WiqlParser::parse(Rule::program, source)?;
    let program_pair = pairs.next().ok_or_else(|| ParseError::Syntax("Empty input".to_string()))?;

    let pipeline = find(program_pair, Rule::pipeline)?;
    parse_pipeline(pipeline)
}

fn parse_pipeline(pair: Pair<Rule>) -> Result<Expr, ParseError> {
    let mut inner = pair.into_inner();
    let source = inner
        .next()
        .ok_or_else(|| ParseError::Syntax("Missing source".to_string()))?;
    let entity = find(source, Rule::ident)?.as_str();

    let mut query = Expr::table(entity);
    for op_pair in inner {
        if op_pair.as_rule() == Rule::op {
            query = apply_operator(query, first(op_pair)?)?;
        }
    }

    Ok(query)
}

fn apply_operator(query: Expr, pair: Pair<Rule>) -> Result<Expr, ParseError> {
    match pair.as_rule() {
        Rule::select_op => {
            let list = pair
                .into_inner()
                .find(|p| matches!(p.as_rule(), Rule::wildcard | Rule::field_list))
                .ok_or_else(|| ParseError::Syntax("Missing select list".to_string()))?;

            let projection = match list.as_rule() {
                Rule::field_list => {
                    Projection::Fields(list.into_inner().map(|p| p.as_str().to_string()).collect())
                }
                _ => Projection::All,
            };
            Ok(query.select(projection))
        }
        Rule::where_op => {
            let predicate = parse_expr(find(pair, Rule::expr)?)?;
            Ok(query.filter(Expr::lambda(PARAMETER, predicate)))
        }
        Rule::order_op => {
            let mut query = query;
            for key in pair.into_inner().filter(|p| p.as_rule() == Rule::sort_key) {
                let (selector, direction) = parse_sort_key(key)?;
                query = query.order_by(Expr::lambda(PARAMETER, selector), direction);
            }
            Ok(query)
        }
        Rule::asof_op => {
            let value = pair
                .into_inner()
                .find(|p| matches!(p.as_rule(), Rule::timestamp | Rule::string))
                .ok_or_else(|| ParseError::Syntax("Missing asof timestamp".to_string()))?;
            let text = match value.as_rule() {
                Rule::timestamp => string_text(find(value, Rule::string)?)?,
                _ => string_text(value)?,
            };
            Ok(query.as_of(parse_timestamp(&text)?))
        }
        _ => Err(ParseError::Syntax(format!("Unknown operator: {:?}", pair.as_rule()))),
    }
}

fn parse_sort_key(pair: Pair<Rule>) -> Result<(Expr, OrderDirection), ParseError> {
    let mut selector = None;
    let mut direction = OrderDirection::Ascending;

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::operand => selector = Some(parse_operand(part)?),
            Rule::direction => {
                if first(part)?.as_rule() == Rule::kw_desc {
                    direction = OrderDirection::Descending;
                }
            }
            _ => {}
        }
    }

    let selector = selector.ok_or_else(|| ParseError::Syntax("Missing sort key".to_string()))?;
    Ok((selector, direction))
}

fn parse_expr(pair: Pair<Rule>) -> Result<Expr, ParseError> {
    match pair.as_rule() {
        Rule::expr | Rule::primary => parse_expr(first(pair)?),
        Rule::or_expr | Rule::and_expr => {
            let op = if pair.as_rule() == Rule::or_expr {
                BinaryOp::OrElse
            } else {
                BinaryOp::AndAlso
            };

            // Operands come interleaved with keyword pairs; fold left-associatively
            let mut operands = pair
                .into_inner()
                .filter(|p| !matches!(p.as_rule(), Rule::kw_or | Rule::kw_and));
            let head = operands
                .next()
                .ok_or_else(|| ParseError::Syntax("Empty expression".to_string()))?;

            let mut left = parse_expr(head)?;
            for operand in operands {
                left = Expr::binary(op, left, parse_expr(operand)?);
            }
            Ok(left)
        }
        Rule::not_expr => {
            let mut inner = pair.into_inner();
            let head = inner
                .next()
                .ok_or_else(|| ParseError::Syntax("Empty expression".to_string()))?;

            if head.as_rule() == Rule::kw_not {
                let operand = inner
                    .next()
                    .ok_or_else(|| ParseError::Syntax("Missing operand after 'not'".to_string()))?;
                Ok(parse_expr(operand)?.negated())
            } else {
                parse_expr(head)
            }
        }
        Rule::predicate => parse_predicate(pair),
        _ => Err(ParseError::Syntax(format!("Cannot parse expr: {:?}", pair.as_rule()))),
    }
}

fn parse_predicate(pair: Pair<Rule>) -> Result<Expr, ParseError> {
    let mut inner = pair.into_inner();
    let (Some(subject), Some(op), Some(value)) = (inner.next(), inner.next(), inner.next()) else {
        return Err(ParseError::Syntax("Incomplete predicate".to_string()));
    };

    let subject = Box::new(parse_operand(subject)?);
    let target = Box::new(parse_value(value)?);

    match op.as_rule() {
        Rule::cmp_op => {
            let op = match op.as_str() {
                "=" => BinaryOp::Equal,
                "<>" | "!=" => BinaryOp::NotEqual,
                "<" => BinaryOp::LessThan,
                "<=" => BinaryOp::LessThanOrEqual,
                ">" => BinaryOp::GreaterThan,
                ">=" => BinaryOp::GreaterThanOrEqual,
                other => return Err(ParseError::Syntax(format!("Unknown operator: {}", other))),
            };
            Ok(Expr::Binary { op, left: subject, right: target })
        }
        Rule::domain_op => match first(op)?.as_rule() {
            Rule::op_in => Ok(Expr::In { subject, target }),
            Rule::op_under => Ok(Expr::Under { subject, target }),
            Rule::op_ever => Ok(Expr::WasEver { subject, target }),
            Rule::op_contains => Ok(Expr::Contains { subject, target }),
            Rule::op_in_group => Ok(Expr::InGroup { subject, target }),
            Rule::op_not_in_group => Ok(Expr::NotInGroup { subject, target }),
            other => Err(ParseError::Syntax(format!("Unknown operator: {:?}", other))),
        },
        other => Err(ParseError::Syntax(format!("Expected operator, found {:?}", other))),
    }
}

fn parse_operand(pair: Pair<Rule>) -> Result<Expr, ParseError> {
    let inner = first(pair)?;
    match inner.as_rule() {
        Rule::ident => Ok(Expr::field(inner.as_str())),
        Rule::indexer => Ok(Expr::indexer(find(inner, Rule::indexer_key)?.as_str())),
        other => Err(ParseError::Syntax(format!("Invalid operand: {:?}", other))),
    }
}

fn parse_value(pair: Pair<Rule>) -> Result<Expr, ParseError> {
    let inner = first(pair)?;
    let constant = match inner.as_rule() {
        Rule::string => Constant::String(string_text(inner)?),
        Rule::number => parse_number(inner.as_str())?,
        Rule::null => Constant::Null,
        Rule::timestamp => Constant::Timestamp(parse_timestamp(&string_text(find(inner, Rule::string)?)?)?),
        Rule::list => parse_list(inner)?,
        other => return Err(ParseError::Syntax(format!("Invalid value: {:?}", other))),
    };
    Ok(Expr::constant(constant))
}

fn parse_list(pair: Pair<Rule>) -> Result<Constant, ParseError> {
    let mut numbers = Vec::new();
    let mut strings = Vec::new();

    for scalar in pair.into_inner() {
        let item = first(scalar)?;
        match item.as_rule() {
            Rule::string => strings.push(string_text(item)?),
            _ => match parse_number(item.as_str())? {
                Constant::Int32(n) => numbers.push(n),
                _ => {
                    return Err(ParseError::InvalidLiteral(format!(
                        "List elements must be 32-bit integers or strings: {}",
                        item.as_str()
                    )))
                }
            },
        }
    }

    match (numbers.is_empty(), strings.is_empty()) {
        (false, true) => Ok(Constant::IntList(numbers)),
        (true, false) => Ok(Constant::StringList(strings)),
        (true, true) => Err(ParseError::InvalidLiteral("Empty list".to_string())),
        (false, false) => Err(ParseError::InvalidLiteral(
            "List mixes numbers and strings".to_string(),
        )),
    }
}

fn parse_number(text: &str) -> Result<Constant, ParseError> {
    if text.contains('.') {
        return text
            .parse::<f64>()
            .map(Constant::Float64)
            .map_err(|_| ParseError::InvalidLiteral(text.to_string()));
    }

    let value: i64 = text
        .parse()
        .map_err(|_| ParseError::InvalidLiteral(text.to_string()))?;
    Ok(match i32::try_from(value) {
        Ok(v) => Constant::Int32(v),
        Err(_) => Constant::Int64(value),
    })
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC)
fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, ParseError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| ParseError::InvalidLiteral(format!("Invalid timestamp '{}'", text)))
}

fn string_text(pair: Pair<Rule>) -> Result<String, ParseError> {
    Ok(find(pair, Rule::string_inner)?.as_str().replace("''", "'"))
}

fn first(pair: Pair<Rule>) -> Result<Pair<Rule>, ParseError> {
    let rule = pair.as_rule();
    pair.into_inner()
        .next()
        .ok_or_else(|| ParseError::Syntax(format!("Empty {:?}", rule)))
}

fn find(pair: Pair<Rule>, rule: Rule) -> Result<Pair<Rule>, ParseError> {
    let parent = pair.as_rule();
    pair.into_inner()
        .find(|p| p.as_rule() == rule)
        .ok_or_else(|| ParseError::Syntax(format!("Missing {:?} in {:?}", rule, parent)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn where_body(query: &Expr) -> &Expr {
        match query {
            Expr::Where { filter, .. } => match filter.as_ref() {
                Expr::Lambda { body, .. } => body,
                other => panic!("expected lambda, got {:?}", other),
            },
            other => panic!("expected where, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_source_only() {
        let query = parse("from Task").unwrap();
        assert_eq!(query, Expr::table("Task"));
    }

    #[test]
    fn test_parse_select_fields() {
        let query = parse("from Bug | select Title, State").unwrap();
        assert_eq!(
            query,
            Expr::table("Bug").select(Projection::Fields(vec!["Title".into(), "State".into()]))
        );

        let all = parse("from Bug | select *").unwrap();
        assert_eq!(all, Expr::table("Bug").select(Projection::All));
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let query = parse("from Task | where A = 1 or B = 2 and C = 3").unwrap();
        let expected = Expr::field("A")
            .equals(Expr::constant(Constant::Int32(1)))
            .or(Expr::field("B")
                .equals(Expr::constant(Constant::Int32(2)))
                .and(Expr::field("C").equals(Expr::constant(Constant::Int32(3)))));

        assert_eq!(where_body(&query), &expected);
    }

    #[test]
    fn test_not_and_parentheses() {
        let query = parse("from Task | where not (State = 'Closed' and Reason = 'Fixed')").unwrap();
        let expected = Expr::field("State")
            .equals(Expr::constant(Constant::String("Closed".into())))
            .and(Expr::field("Reason").equals(Expr::constant(Constant::String("Fixed".into()))))
            .negated();

        assert_eq!(where_body(&query), &expected);
    }

    #[test]
    fn test_keyword_prefix_is_an_identifier() {
        let query = parse("from Task | where Notes = 'x' and Order = 1").unwrap();
        let expected = Expr::field("Notes")
            .equals(Expr::constant(Constant::String("x".into())))
            .and(Expr::field("Order").equals(Expr::constant(Constant::Int32(1))));

        assert_eq!(where_body(&query), &expected);
    }

    #[test]
    fn test_domain_operators() {
        let cases = [
            ("Id in (1, 2, 3)", "In"),
            ("AreaPath under 'Proj\\Web'", "Under"),
            ("State ever 'Resolved'", "WasEver"),
            ("Title contains 'crash'", "Contains"),
            ("AssignedTo in group '[Proj]\\Team'", "InGroup"),
            ("AssignedTo not in group '[Proj]\\Team'", "NotInGroup"),
        ];

        for (predicate, variant) in cases {
            let query = parse(&format!("from Task | where {}", predicate)).unwrap();
            let body = where_body(&query);
            let actual = match body {
                Expr::In { .. } => "In",
                Expr::Under { .. } => "Under",
                Expr::WasEver { .. } => "WasEver",
                Expr::Contains { .. } => "Contains",
                Expr::InGroup { .. } => "InGroup",
                Expr::NotInGroup { .. } => "NotInGroup",
                _ => "other",
            };
            assert_eq!(actual, variant, "predicate: {}", predicate);
        }
    }

    #[test]
    fn test_literal_kinds() {
        let query = parse("from Task | where Tags in ('a', 'it''s')").unwrap();
        match where_body(&query) {
            Expr::In { target, .. } => assert_eq!(
                target.as_ref(),
                &Expr::constant(Constant::StringList(vec!["a".into(), "it's".into()]))
            ),
            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(parse_number("42").unwrap(), Constant::Int32(42)));
        assert!(matches!(parse_number("-7").unwrap(), Constant::Int32(-7)));
        assert!(matches!(parse_number("8589934592").unwrap(), Constant::Int64(8589934592)));
        assert!(matches!(parse_number("2.5").unwrap(), Constant::Float64(v) if v == 2.5));
    }

    #[test]
    fn test_mixed_list_rejected() {
        let result = parse("from Task | where Id in (1, 'two')");
        assert!(matches!(result, Err(ParseError::InvalidLiteral(_))));
    }

    #[test]
    fn test_empty_list_rejected() {
        for query in ["from Task | where Id in ()", "from Task | where Tags in ( )"] {
            match parse(query) {
                Err(ParseError::InvalidLiteral(message)) => assert_eq!(message, "Empty list"),
                other => panic!("expected InvalidLiteral for {:?}, got {:?}", query, other),
            }
        }
    }

    #[test]
    fn test_indexer_operand() {
        let query = parse("from Task | where [Custom.Team Name] = 'Blue'").unwrap();
        let expected = Expr::indexer("Custom.Team Name").equals(Expr::constant(Constant::String("Blue".into())));
        assert_eq!(where_body(&query), &expected);
    }

    #[test]
    fn test_order_keys_nest_in_call_order() {
        let query = parse("from Task | order by Priority desc, Title").unwrap();
        let expected = Expr::table("Task")
            .order_by(Expr::lambda(PARAMETER, Expr::field("Priority")), OrderDirection::Descending)
            .order_by(Expr::lambda(PARAMETER, Expr::field("Title")), OrderDirection::Ascending);

        assert_eq!(query, expected);
    }

    #[test]
    fn test_asof_and_timestamps() {
        let query = parse("from Task | asof '2024-06-01T12:30:00Z'").unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap();
        assert_eq!(query, Expr::table("Task").as_of(expected));

        let query = parse("from Task | where ChangedDate >= date'2024-01-02'").unwrap();
        let midnight = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        match where_body(&query) {
            Expr::Binary { op: BinaryOp::GreaterThanOrEqual, right, .. } => {
                assert_eq!(right.as_ref(), &Expr::constant(Constant::Timestamp(midnight)))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(parse("select Title"), Err(ParseError::Pest(_))));
        assert!(matches!(parse("from Task | where Priority ="), Err(ParseError::Pest(_))));
        assert!(matches!(
            parse("from Task | asof 'yesterday'"),
            Err(ParseError::InvalidLiteral(_))
        ));
    }
}
