//! AST walker that turns query nodes into clause fragments

use wiql_ast::{BinaryOp, Constant, Expr, OrderDirection, UnaryOp};
use wiql_registry::FieldMapper;

use super::clause::ClauseState;
use super::TranslateError;
use crate::fragment::Fragment;
use crate::query::TranslatedQuery;

const IN: &str = " IN ";
const UNDER: &str = " UNDER ";
const EVER: &str = " EVER ";
const CONTAINS: &str = " CONTAINS ";
const IN_GROUP: &str = " IN GROUP ";
const NOT_IN_GROUP: &str = " NOT IN GROUP ";
const NOT: &str = " NOT ";
const ASC: &str = " asc";
const DESC: &str = " desc";

/// Member name of the wrapper around optional values (`x.Priority.Value`)
const OPTIONAL_VALUE_MEMBER: &str = "Value";

/// Single-use walker; one per translation pass
pub(crate) struct Walker<'a> {
    field_mapper: &'a dyn FieldMapper,
    /// Element type of the root node, used for field resolution until a
    /// `Select` fixes the underlying type
    root_type: Option<String>,
    query: TranslatedQuery,
    pending: ClauseState,
}

impl<'a> Walker<'a> {
    pub(crate) fn new(field_mapper: &'a dyn FieldMapper, root_type: Option<String>) -> Self {
        Self {
            field_mapper,
            root_type,
            query: TranslatedQuery::new(),
            pending: ClauseState::default(),
        }
    }

    pub(crate) fn into_query(self) -> TranslatedQuery {
        self.query
    }

    pub(crate) fn visit<'e>(&mut self, node: &'e Expr) -> Result<&'e Expr, TranslateError> {
        match node {
            Expr::Select { source, projection } => {
                self.visit(source)?;
                if let Some(entity) = source.element_type() {
                    self.query.set_underlying_type(entity);
                }
                self.query.projections.push(projection.clone());
            }
            Expr::Where { source, filter } => {
                self.visit(source)?;
                self.visit(filter)?;

                if let Some(clause) = std::mem::take(&mut self.pending).flush() {
                    tracing::trace!(clause = %clause, "Flushed where clause");
                    self.query.where_clauses.push(clause);
                }
            }
            Expr::Order { source, selector, direction } => {
                self.visit(source)?;
                self.visit(selector)?;

                let keyword = match direction {
                    OrderDirection::Ascending => ASC,
                    OrderDirection::Descending => DESC,
                    OrderDirection::Unspecified => return Err(TranslateError::MalformedOrder),
                };
                self.emit(Fragment::literal(keyword));

                if let Some(clause) = std::mem::take(&mut self.pending).flush() {
                    tracing::trace!(clause = %clause, "Flushed order clause");
                    self.query.then_order_clauses.push(clause);
                }
            }
            Expr::AsOf { source, timestamp } => {
                self.visit(source)?;
                self.query.as_of = Some(*timestamp);
            }
            Expr::In { subject, target } => self.visit_grouped(subject, IN, target)?,
            Expr::Under { subject, target } => self.visit_grouped(subject, UNDER, target)?,
            Expr::WasEver { subject, target } => self.visit_grouped(subject, EVER, target)?,
            Expr::Contains { subject, target } => self.visit_grouped(subject, CONTAINS, target)?,
            Expr::InGroup { subject, target } => self.visit_grouped(subject, IN_GROUP, target)?,
            Expr::NotInGroup { subject, target } => self.visit_grouped(subject, NOT_IN_GROUP, target)?,
            Expr::Unary { op, operand } => match op {
                UnaryOp::Not => {
                    self.emit(Fragment::literal(NOT));
                    self.visit(operand)?;
                }
                // WIQL converts types itself
                UnaryOp::TypeAs => {
                    self.visit(operand)?;
                }
                _ => {
                    return Err(TranslateError::UnsupportedOperation(format!(
                        "The unary operator '{:?}' is not supported",
                        op
                    )))
                }
            },
            Expr::Binary { op, left, right } => {
                self.emit(Fragment::GroupOpen);
                self.visit(left)?;
                self.emit(Fragment::literal(binary_token(*op)?));
                self.visit(right)?;
                self.emit(Fragment::GroupClose);
            }
            Expr::Constant(constant) => self.visit_constant(constant)?,
            Expr::Member { target, name } => return self.visit_member(node, target, name),
            Expr::Indexer { key } => {
                let field = self.resolve(key)?;
                self.emit(Fragment::FieldReference(field));
            }
            Expr::Lambda { body, .. } => {
                self.visit(body)?;
            }
            Expr::Call { arguments, .. } => {
                for argument in arguments {
                    self.visit(argument)?;
                }
            }
            Expr::Parameter(_) => {}
        }

        Ok(node)
    }

    fn visit_grouped(&mut self, subject: &Expr, keyword: &'static str, target: &Expr) -> Result<(), TranslateError> {
        self.emit(Fragment::GroupOpen);
        self.visit(subject)?;
        self.emit(Fragment::literal(keyword));
        self.visit(target)?;
        self.emit(Fragment::GroupClose);
        Ok(())
    }

    fn visit_constant(&mut self, constant: &Constant) -> Result<(), TranslateError> {
        let fragment = match constant {
            // A table reference: whatever was collected on the way to the source is not part of a clause
            Constant::Queryable(_) => {
                self.pending.reset();
                return Ok(());
            }
            Constant::Null => Fragment::Constant(String::new()),
            Constant::String(s) => Fragment::Constant(s.clone()),
            Constant::Timestamp(ts) => Fragment::Timestamp(*ts),
            Constant::IntList(values) if !values.is_empty() => Fragment::NumberList(values.clone()),
            Constant::StringList(values) if !values.is_empty() => Fragment::StringList(values.clone()),
            Constant::Int16(v) => Fragment::literal(v.to_string()),
            Constant::Int32(v) => Fragment::literal(v.to_string()),
            Constant::Int64(v) => Fragment::literal(v.to_string()),
            Constant::Float64(v) if v.is_finite() => Fragment::literal(v.to_string()),
            // Empty lists and NaN or infinite floats have no WIQL spelling
            Constant::IntList(_)
            | Constant::StringList(_)
            | Constant::Float64(_)
            | Constant::Bool(_)
            | Constant::Opaque { .. } => {
                return Err(TranslateError::UnsupportedOperation(format!(
                    "The constant for '{}' is not supported",
                    constant
                )))
            }
        };

        self.emit(fragment);
        Ok(())
    }

    fn visit_member<'e>(&mut self, node: &'e Expr, target: &'e Expr, name: &str) -> Result<&'e Expr, TranslateError> {
        match target {
            Expr::Parameter(_) | Expr::Unary { op: UnaryOp::Convert, .. } => {
                let field = self.resolve(name)?;
                self.emit(Fragment::FieldReference(field));
                Ok(node)
            }
            // `it.Priority.Value` reads the same field as `it.Priority`
            Expr::Member { .. } | Expr::Indexer { .. } | Expr::Unary { op: UnaryOp::TypeAs, .. }
                if name == OPTIONAL_VALUE_MEMBER =>
            {
                self.visit(target)
            }
            _ => Err(TranslateError::UnsupportedOperation(format!(
                "The member '{}' is not supported",
                name
            ))),
        }
    }

    fn resolve(&self, property: &str) -> Result<String, TranslateError> {
        let entity = self
            .query
            .underlying_type
            .as_deref()
            .or(self.root_type.as_deref())
            .ok_or(TranslateError::MissingSource)?;

        Ok(self.field_mapper.resolve(entity, property)?)
    }

    fn emit(&mut self, fragment: Fragment) {
        self.pending.push(fragment);
    }
}

fn binary_token(op: BinaryOp) -> Result<&'static str, TranslateError> {
    let token = match op {
        BinaryOp::And | BinaryOp::AndAlso => " AND ",
        BinaryOp::Or | BinaryOp::OrElse => " OR ",
        BinaryOp::Equal => " = ",
        BinaryOp::NotEqual => " <> ",
        BinaryOp::LessThan => " < ",
        BinaryOp::LessThanOrEqual => " <= ",
        BinaryOp::GreaterThan => " > ",
        BinaryOp::GreaterThanOrEqual => " >= ",
        _ => {
            return Err(TranslateError::UnsupportedOperation(format!(
                "The binary operator '{:?}' is not supported",
                op
            )))
        }
    };
    Ok(token)
}
