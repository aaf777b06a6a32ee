use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnaryOp {
    #[serde(rename = "!")]
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOp {
    #[serde(rename = "&")]
    And,
    #[serde(rename = "|")]
    Or,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Not => f.write_str("!"),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOp::And => f.write_str("&"),
            BinaryOp::Or => f.write_str("|"),
        }
    }
}

/// Parsed query tree. Leaves are word tests; `Literal` (quoted or numeric
/// tokens) and `Identifier` (bare words) match the same way.
///
/// Serializes in the shape `{"type": "BinaryExpression", "operator": "&", …}`
/// for debug output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type")]
pub enum QueryNode {
    Literal {
        value: String,
    },
    Identifier {
        name: String,
    },
    #[serde(rename = "UnaryExpression")]
    Unary {
        operator: UnaryOp,
        argument: Box<QueryNode>,
    },
    #[serde(rename = "BinaryExpression")]
    Binary {
        operator: BinaryOp,
        left: Box<QueryNode>,
        right: Box<QueryNode>,
    },
}

impl QueryNode {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into().to_lowercase(),
        }
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        Self::Identifier {
            name: name.into().to_lowercase(),
        }
    }

    pub fn not(argument: QueryNode) -> Self {
        Self::Unary {
            operator: UnaryOp::Not,
            argument: Box::new(argument),
        }
    }

    pub fn and(left: QueryNode, right: QueryNode) -> Self {
        Self::binary(BinaryOp::And, left, right)
    }

    pub fn or(left: QueryNode, right: QueryNode) -> Self {
        Self::binary(BinaryOp::Or, left, right)
    }

    pub fn binary(operator: BinaryOp, left: QueryNode, right: QueryNode) -> Self {
        Self::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Every word the query tests for, left to right.
    pub fn words(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_words(&mut out);
        out
    }

    fn collect_words<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            QueryNode::Literal { value } => out.push(value),
            QueryNode::Identifier { name } => out.push(name),
            QueryNode::Unary { argument, .. } => argument.collect_words(out),
            QueryNode::Binary { left, right, .. } => {
                left.collect_words(out);
                right.collect_words(out);
            }
        }
    }
}

/// Canonical, fully parenthesised form that parses back to the same tree.
impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryNode::Literal { value } if value.contains('"') => write!(f, "'{value}'"),
            QueryNode::Literal { value } => write!(f, "\"{value}\""),
            QueryNode::Identifier { name } => f.write_str(name),
            QueryNode::Unary { operator, argument } => write!(f, "{operator}{argument}"),
            QueryNode::Binary { operator, left, right } => write!(f, "({left} {operator} {right})"),
        }
    }
}
