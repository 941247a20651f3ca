//! AST types for WIQL queries
//!
//! The tree mirrors the shape produced by a query builder: each query operator
//! wraps its source, and predicates hang off `Where` nodes as lambdas over a
//! single parameter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Query expression node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Select {
        source: Box<Expr>,
        projection: Projection,
    },
    Where {
        source: Box<Expr>,
        filter: Box<Expr>,
    },
    Order {
        source: Box<Expr>,
        selector: Box<Expr>,
        direction: OrderDirection,
    },
    AsOf {
        source: Box<Expr>,
        timestamp: DateTime<Utc>,
    },

    // Domain predicates
    In { subject: Box<Expr>, target: Box<Expr> },
    Under { subject: Box<Expr>, target: Box<Expr> },
    WasEver { subject: Box<Expr>, target: Box<Expr> },
    Contains { subject: Box<Expr>, target: Box<Expr> },
    InGroup { subject: Box<Expr>, target: Box<Expr> },
    NotInGroup { subject: Box<Expr>, target: Box<Expr> },

    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Member {
        target: Box<Expr>,
        name: String,
    },
    /// Field access by its literal key, e.g. `it["Custom.Field"]`
    Indexer {
        key: String,
    },
    Constant(Constant),
    Parameter(String),

    // Composition nodes with no textual form of their own
    Lambda {
        parameter: String,
        body: Box<Expr>,
    },
    Call {
        method: String,
        arguments: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Logical
    And,
    AndAlso,
    Or,
    OrElse,
    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Coalesce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    /// `x as T`
    TypeAs,
    /// `(T)x`
    Convert,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    Ascending,
    Descending,
    /// The builder produced an ordering without a direction
    Unspecified,
}

/// Projection request attached to a `Select` node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    All,
    Fields(Vec<String>),
}

/// Root table reference of a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub entity: String,
}

/// Constant values, classified by the front end before they reach a translator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    /// The queryable source itself
    Queryable(Table),
    Null,
    String(String),
    Timestamp(DateTime<Utc>),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    IntList(Vec<i32>),
    StringList(Vec<String>),
    Bool(bool),
    /// A host value with no query-language form
    Opaque { type_name: String, text: String },
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Queryable(table) => write!(f, "Query<{}>", table.entity),
            Constant::Null => f.write_str("null"),
            Constant::String(s) => f.write_str(s),
            Constant::Timestamp(ts) => write!(f, "{}", ts),
            Constant::Int16(v) => write!(f, "{}", v),
            Constant::Int32(v) => write!(f, "{}", v),
            Constant::Int64(v) => write!(f, "{}", v),
            Constant::Float64(v) => write!(f, "{}", v),
            Constant::IntList(values) => write!(f, "{:?}", values),
            Constant::StringList(values) => write!(f, "{:?}", values),
            Constant::Bool(b) => write!(f, "{}", b),
            Constant::Opaque { type_name, text } => write!(f, "{} ({})", text, type_name),
        }
    }
}

impl Expr {
    /// Reference to the queryable source for `entity`
    pub fn table(entity: impl Into<String>) -> Self {
        Expr::Constant(Constant::Queryable(Table { entity: entity.into() }))
    }

    pub fn constant(value: Constant) -> Self {
        Expr::Constant(value)
    }

    pub fn parameter(name: impl Into<String>) -> Self {
        Expr::Parameter(name.into())
    }

    /// Property access on the lambda parameter `it`
    pub fn field(name: impl Into<String>) -> Self {
        Expr::Member {
            target: Box::new(Expr::parameter("it")),
            name: name.into(),
        }
    }

    pub fn indexer(key: impl Into<String>) -> Self {
        Expr::Indexer { key: key.into() }
    }

    pub fn member(self, name: impl Into<String>) -> Self {
        Expr::Member {
            target: Box::new(self),
            name: name.into(),
        }
    }

    pub fn lambda(parameter: impl Into<String>, body: Expr) -> Self {
        Expr::Lambda {
            parameter: parameter.into(),
            body: Box::new(body),
        }
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn equals(self, right: Expr) -> Self {
        Expr::binary(BinaryOp::Equal, self, right)
    }

    pub fn and(self, right: Expr) -> Self {
        Expr::binary(BinaryOp::AndAlso, self, right)
    }

    pub fn or(self, right: Expr) -> Self {
        Expr::binary(BinaryOp::OrElse, self, right)
    }

    pub fn negated(self) -> Self {
        Expr::unary(UnaryOp::Not, self)
    }

    pub fn select(self, projection: Projection) -> Self {
        Expr::Select {
            source: Box::new(self),
            projection,
        }
    }

    pub fn filter(self, filter: Expr) -> Self {
        Expr::Where {
            source: Box::new(self),
            filter: Box::new(filter),
        }
    }

    pub fn order_by(self, selector: Expr, direction: OrderDirection) -> Self {
        Expr::Order {
            source: Box::new(self),
            selector: Box::new(selector),
            direction,
        }
    }

    pub fn as_of(self, timestamp: DateTime<Utc>) -> Self {
        Expr::AsOf {
            source: Box::new(self),
            timestamp,
        }
    }

    /// Entity kind produced by this node, if it yields records at all
    pub fn element_type(&self) -> Option<&str> {
        match self {
            Expr::Constant(Constant::Queryable(table)) => Some(&table.entity),
            Expr::Select { source, .. }
            | Expr::Where { source, .. }
            | Expr::Order { source, .. }
            | Expr::AsOf { source, .. } => source.element_type(),
            Expr::Call { arguments, .. } => arguments.iter().find_map(Expr::element_type),
            _ => None,
        }
    }
}
