//! Declarative condition trees.
//!
//! A [`Condition`] is either a junction (`all`/`any`/`none`) over child
//! conditions or a leaf comparison `{subject, operator, value}`. The JSON
//! form is the one rules are authored in:
//!
//! ```json
//! { "all": [
//!     { "subject": "tab.domain", "operator": "equals", "value": "github.com" },
//!     { "subject": "tab.age", "operator": "greater_than", "value": "2h" }
//! ] }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A condition tree. Compiled into a [`Predicate`](crate::predicate::Predicate).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "ConditionRepr", into = "ConditionRepr")]
pub enum Condition {
    /// Every child matches. Empty matches everything.
    All(Vec<Condition>),
    /// At least one child matches. Empty matches nothing.
    Any(Vec<Condition>),
    /// No child matches. Empty matches everything.
    None(Vec<Condition>),
    /// A single comparison.
    Leaf(Leaf),
}

impl Condition {
    /// Leaf comparison against a scalar value.
    pub fn leaf(subject: &str, operator: Operator, value: impl Into<Literal>) -> Self {
        Self::Leaf(Leaf {
            subject: subject.to_owned(),
            operator: Some(operator.as_str().to_owned()),
            value: Some(ConditionValue::Scalar(value.into())),
        })
    }

    /// Leaf comparison against a list (`in` / `not_in`).
    pub fn leaf_list<L: Into<Literal>>(
        subject: &str,
        operator: Operator,
        values: impl IntoIterator<Item = L>,
    ) -> Self {
        Self::Leaf(Leaf {
            subject: subject.to_owned(),
            operator: Some(operator.as_str().to_owned()),
            value: Some(ConditionValue::List(
                values.into_iter().map(Into::into).collect(),
            )),
        })
    }

    /// Bare boolean subject, e.g. `{"subject": "tab.pinned"}`.
    pub fn is_true(subject: &str) -> Self {
        Self::Leaf(Leaf {
            subject: subject.to_owned(),
            operator: None,
            value: None,
        })
    }

    /// Junction with no children at the top level.
    pub fn is_empty_junction(&self) -> bool {
        match self {
            Self::All(children) | Self::Any(children) | Self::None(children) => children.is_empty(),
            Self::Leaf(_) => false,
        }
    }
}

/// Leaf comparison as written. Operator and value are checked at compile time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    /// Field path, e.g. `tab.domain`.
    pub subject: String,
    /// Operator name. Absent on bare boolean subjects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    /// Comparison value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ConditionValue>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ConditionRepr {
    All { all: Vec<Condition> },
    Any { any: Vec<Condition> },
    None { none: Vec<Condition> },
    Leaf(Leaf),
}

impl From<ConditionRepr> for Condition {
    fn from(repr: ConditionRepr) -> Self {
        match repr {
            ConditionRepr::All { all } => Self::All(all),
            ConditionRepr::Any { any } => Self::Any(any),
            ConditionRepr::None { none } => Self::None(none),
            ConditionRepr::Leaf(leaf) => Self::Leaf(leaf),
        }
    }
}

impl From<Condition> for ConditionRepr {
    fn from(condition: Condition) -> Self {
        match condition {
            Condition::All(all) => Self::All { all },
            Condition::Any(any) => Self::Any { any },
            Condition::None(none) => Self::None { none },
            Condition::Leaf(leaf) => Self::Leaf(leaf),
        }
    }
}

/// A leaf value: one literal or a list of literals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    /// `in` / `not_in` operand.
    List(Vec<Literal>),
    /// Operand for every other operator.
    Scalar(Literal),
}

/// A JSON scalar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    /// `true` / `false`.
    Bool(bool),
    /// Any JSON number.
    Number(f64),
    /// Any JSON string.
    String(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "\"{s}\""),
        }
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Literal {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Literal {
    #[allow(clippy::cast_precision_loss)]
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

/// Leaf comparison operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `==`
    Equals,
    /// `!=`
    NotEquals,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// Substring.
    Contains,
    /// Negated substring.
    NotContains,
    /// Prefix.
    StartsWith,
    /// Suffix.
    EndsWith,
    /// Regex match.
    Matches,
    /// Membership in a list.
    In,
    /// Non-membership in a list.
    NotIn,
}

impl Operator {
    /// Every operator, in declaration order.
    pub const ALL: [Self; 13] = [
        Self::Equals,
        Self::NotEquals,
        Self::GreaterThan,
        Self::GreaterThanOrEqual,
        Self::LessThan,
        Self::LessThanOrEqual,
        Self::Contains,
        Self::NotContains,
        Self::StartsWith,
        Self::EndsWith,
        Self::Matches,
        Self::In,
        Self::NotIn,
    ];

    /// Wire name, e.g. `greater_than_or_equal`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::GreaterThan => "greater_than",
            Self::GreaterThanOrEqual => "greater_than_or_equal",
            Self::LessThan => "less_than",
            Self::LessThanOrEqual => "less_than_or_equal",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::Matches => "matches",
            Self::In => "in",
            Self::NotIn => "not_in",
        }
    }

    /// Whether the operand must be a list.
    pub fn takes_list(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| s.to_owned())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
