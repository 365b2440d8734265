//! Predicate compiler.
//!
//! [`compile`] turns a [`Condition`] into a [`Predicate`]: junctions become
//! boolean combinators, leaves become a resolved [`Subject`] plus an
//! operator and a pre-parsed operand. All type checking happens here, so
//! [`Predicate::matches`] never fails.
//!
//! Absent subject values (no `createdAt`, no group, no window) only satisfy
//! `not_equals` and `not_in`.

use std::borrow::Cow;

use regex::{Regex, RegexBuilder};
use tabtick_core::duration::parse_duration_ms;

use crate::condition::{Condition, ConditionValue, Leaf, Literal, Operator};
use crate::errors::CompileError;
use crate::evaluator::EvaluationContext;

/// Declared type of a subject, which decides the legal operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubjectType {
    /// Compared case-insensitively; supports substring and regex operators.
    String,
    /// Plain number.
    Number,
    /// Milliseconds; values accept `<int><unit>` literals.
    Duration,
    /// `true` / `false`.
    Bool,
}

impl SubjectType {
    /// Lowercase type name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Duration => "duration",
            Self::Bool => "bool",
        }
    }

    /// Whether `operator` is defined for this type.
    pub fn supports(self, operator: Operator) -> bool {
        use Operator::{
            Contains, EndsWith, Equals, GreaterThan, GreaterThanOrEqual, In, LessThan,
            LessThanOrEqual, Matches, NotContains, NotEquals, NotIn, StartsWith,
        };
        match self {
            Self::String => matches!(
                operator,
                Equals | NotEquals | Contains | NotContains | StartsWith | EndsWith | Matches | In | NotIn
            ),
            Self::Number | Self::Duration => matches!(
                operator,
                Equals
                    | NotEquals
                    | GreaterThan
                    | GreaterThanOrEqual
                    | LessThan
                    | LessThanOrEqual
                    | In
                    | NotIn
            ),
            Self::Bool => matches!(operator, Equals | NotEquals),
        }
    }
}

/// A resolvable field of the evaluation context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Subject {
    /// `tab.url`
    Url,
    /// `tab.title`
    Title,
    /// `tab.domain`
    Domain,
    /// `tab.origin`
    Origin,
    /// `tab.category`
    Category,
    /// `tab.dedup_key`
    DedupKey,
    /// `tab.age`
    Age,
    /// `tab.last_access`
    LastAccess,
    /// `tab.domain_count`
    DomainCount,
    /// `tab.id`
    TabId,
    /// `tab.window_id`
    TabWindowId,
    /// `tab.group_id`
    GroupId,
    /// `tab.index`
    Index,
    /// `window.id`
    WindowId,
    /// `window.tab_count`
    WindowTabCount,
    /// `tab.pinned`
    Pinned,
    /// `tab.audible`
    Audible,
    /// `tab.muted`
    Muted,
    /// `tab.active`
    Active,
    /// `tab.discarded`
    Discarded,
    /// `tab.grouped`
    Grouped,
    /// `tab.is_dupe`
    IsDupe,
    /// `window.focused`
    WindowFocused,
    /// `window.incognito`
    WindowIncognito,
}

const SUBJECTS: &[(&str, Subject)] = &[
    ("tab.url", Subject::Url),
    ("tab.title", Subject::Title),
    ("tab.domain", Subject::Domain),
    ("tab.origin", Subject::Origin),
    ("tab.category", Subject::Category),
    ("tab.dedup_key", Subject::DedupKey),
    ("tab.dedupKey", Subject::DedupKey),
    ("tab.age", Subject::Age),
    ("tab.last_access", Subject::LastAccess),
    ("tab.lastAccess", Subject::LastAccess),
    ("tab.domain_count", Subject::DomainCount),
    ("tab.domainCount", Subject::DomainCount),
    ("tab.id", Subject::TabId),
    ("tab.window_id", Subject::TabWindowId),
    ("tab.windowId", Subject::TabWindowId),
    ("tab.group_id", Subject::GroupId),
    ("tab.groupId", Subject::GroupId),
    ("tab.index", Subject::Index),
    ("window.id", Subject::WindowId),
    ("window.tab_count", Subject::WindowTabCount),
    ("window.tabCount", Subject::WindowTabCount),
    ("tab.pinned", Subject::Pinned),
    ("tab.audible", Subject::Audible),
    ("tab.muted", Subject::Muted),
    ("tab.active", Subject::Active),
    ("tab.discarded", Subject::Discarded),
    ("tab.grouped", Subject::Grouped),
    ("tab.is_dupe", Subject::IsDupe),
    ("tab.isDupe", Subject::IsDupe),
    ("tab.duplicate", Subject::IsDupe),
    ("duplicate", Subject::IsDupe),
    ("duplicate(dedupKey)", Subject::IsDupe),
    ("window.focused", Subject::WindowFocused),
    ("window.incognito", Subject::WindowIncognito),
];

impl Subject {
    /// Resolve a subject path. Unprefixed names resolve to `tab.*`.
    pub fn resolve(path: &str) -> Option<Self> {
        let path = path.trim();
        let qualified = if path.starts_with("tab.")
            || path.starts_with("window.")
            || path.starts_with("duplicate")
        {
            Cow::Borrowed(path)
        } else {
            Cow::Owned(format!("tab.{path}"))
        };
        SUBJECTS
            .iter()
            .find(|(name, _)| *name == qualified)
            .map(|(_, subject)| *subject)
    }

    /// Declared type.
    pub fn kind(self) -> SubjectType {
        match self {
            Self::Url | Self::Title | Self::Domain | Self::Origin | Self::Category | Self::DedupKey => {
                SubjectType::String
            }
            Self::Age | Self::LastAccess => SubjectType::Duration,
            Self::DomainCount
            | Self::TabId
            | Self::TabWindowId
            | Self::GroupId
            | Self::Index
            | Self::WindowId
            | Self::WindowTabCount => SubjectType::Number,
            Self::Pinned
            | Self::Audible
            | Self::Muted
            | Self::Active
            | Self::Discarded
            | Self::Grouped
            | Self::IsDupe
            | Self::WindowFocused
            | Self::WindowIncognito => SubjectType::Bool,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn value<'c>(self, ctx: &'c EvaluationContext<'_>) -> Option<Value<'c>> {
        let tab = ctx.tab;
        let derived = ctx.derived;
        let value = match self {
            Self::Url => Value::Str(&tab.url),
            Self::Title => Value::Str(&tab.title),
            Self::Domain => Value::Str(&derived.domain),
            Self::Origin => Value::Str(&derived.origin),
            Self::Category => Value::Str(&derived.category),
            Self::DedupKey => Value::Str(&derived.dedup_key),
            Self::Age => Value::Number(derived.age_ms? as f64),
            Self::LastAccess => Value::Number(derived.last_access_ms? as f64),
            Self::DomainCount => Value::Number(ctx.domain_count as f64),
            Self::TabId => Value::Number(tab.id.get() as f64),
            Self::TabWindowId => Value::Number(tab.window_id.get() as f64),
            Self::GroupId => Value::Number(tab.group_id?.get() as f64),
            Self::Index => Value::Number(f64::from(tab.index)),
            Self::WindowId => Value::Number(ctx.window?.id.get() as f64),
            Self::WindowTabCount => Value::Number(ctx.window_tab_count as f64),
            Self::Pinned => Value::Bool(tab.pinned),
            Self::Audible => Value::Bool(tab.audible),
            Self::Muted => Value::Bool(tab.muted),
            Self::Active => Value::Bool(tab.active),
            Self::Discarded => Value::Bool(tab.discarded),
            Self::Grouped => Value::Bool(tab.is_grouped()),
            Self::IsDupe => Value::Bool(ctx.is_dupe),
            Self::WindowFocused => Value::Bool(ctx.window?.focused),
            Self::WindowIncognito => Value::Bool(ctx.window?.incognito),
        };
        Some(value)
    }
}

#[derive(Clone, Copy, Debug)]
enum Value<'c> {
    Str(&'c str),
    Number(f64),
    Bool(bool),
}

#[derive(Clone, Debug)]
enum Operand {
    /// Lowercased.
    Text(String),
    TextList(Vec<String>),
    Number(f64),
    NumberList(Vec<f64>),
    Bool(bool),
    Pattern(Regex),
}

/// A type-checked leaf comparison.
#[derive(Clone, Debug)]
pub struct CompiledLeaf {
    subject: Subject,
    operator: Operator,
    operand: Operand,
}

impl CompiledLeaf {
    /// Resolved subject.
    pub fn subject(&self) -> Subject {
        self.subject
    }

    /// Comparison operator.
    pub fn operator(&self) -> Operator {
        self.operator
    }

    #[allow(clippy::float_cmp)]
    fn matches(&self, ctx: &EvaluationContext<'_>) -> bool {
        let Some(value) = self.subject.value(ctx) else {
            return matches!(self.operator, Operator::NotEquals | Operator::NotIn);
        };
        match (value, &self.operand) {
            (Value::Str(s), Operand::Pattern(re)) => re.is_match(s),
            (Value::Str(s), Operand::Text(needle)) => {
                let s = s.to_ascii_lowercase();
                match self.operator {
                    Operator::Equals => s == *needle,
                    Operator::NotEquals => s != *needle,
                    Operator::Contains => s.contains(needle.as_str()),
                    Operator::NotContains => !s.contains(needle.as_str()),
                    Operator::StartsWith => s.starts_with(needle.as_str()),
                    Operator::EndsWith => s.ends_with(needle.as_str()),
                    _ => false,
                }
            }
            (Value::Str(s), Operand::TextList(items)) => {
                let s = s.to_ascii_lowercase();
                let found = items.iter().any(|item| *item == s);
                found == (self.operator == Operator::In)
            }
            (Value::Number(n), Operand::Number(x)) => match self.operator {
                Operator::Equals => n == *x,
                Operator::NotEquals => n != *x,
                Operator::GreaterThan => n > *x,
                Operator::GreaterThanOrEqual => n >= *x,
                Operator::LessThan => n < *x,
                Operator::LessThanOrEqual => n <= *x,
                _ => false,
            },
            (Value::Number(n), Operand::NumberList(items)) => {
                let found = items.iter().any(|item| *item == n);
                found == (self.operator == Operator::In)
            }
            (Value::Bool(b), Operand::Bool(x)) => match self.operator {
                Operator::Equals => b == *x,
                Operator::NotEquals => b != *x,
                _ => false,
            },
            _ => false,
        }
    }
}

/// A compiled condition tree.
#[derive(Clone, Debug)]
pub enum Predicate {
    /// Every child matches.
    All(Vec<Predicate>),
    /// At least one child matches.
    Any(Vec<Predicate>),
    /// No child matches.
    None(Vec<Predicate>),
    /// One comparison.
    Leaf(CompiledLeaf),
}

impl Predicate {
    /// Apply the predicate to one context. Never fails.
    pub fn matches(&self, ctx: &EvaluationContext<'_>) -> bool {
        match self {
            Self::All(children) => children.iter().all(|c| c.matches(ctx)),
            Self::Any(children) => children.iter().any(|c| c.matches(ctx)),
            Self::None(children) => !children.iter().any(|c| c.matches(ctx)),
            Self::Leaf(leaf) => leaf.matches(ctx),
        }
    }
}

/// Compile a condition tree.
pub fn compile(condition: &Condition) -> Result<Predicate, CompileError> {
    let compile_all = |children: &[Condition]| children.iter().map(compile).collect::<Result<Vec<_>, _>>();
    Ok(match condition {
        Condition::All(children) => Predicate::All(compile_all(children)?),
        Condition::Any(children) => Predicate::Any(compile_all(children)?),
        Condition::None(children) => Predicate::None(compile_all(children)?),
        Condition::Leaf(leaf) => Predicate::Leaf(compile_leaf(leaf)?),
    })
}

fn compile_leaf(leaf: &Leaf) -> Result<CompiledLeaf, CompileError> {
    let subject = Subject::resolve(&leaf.subject).ok_or_else(|| CompileError::UnknownSubject {
        subject: leaf.subject.clone(),
    })?;
    let kind = subject.kind();

    let Some(value) = &leaf.value else {
        if leaf.operator.is_none() && kind == SubjectType::Bool {
            return Ok(CompiledLeaf {
                subject,
                operator: Operator::Equals,
                operand: Operand::Bool(true),
            });
        }
        return Err(CompileError::MissingOperator {
            subject: leaf.subject.clone(),
        });
    };

    let operator = match &leaf.operator {
        None => Operator::Equals,
        Some(name) => name.parse().map_err(|operator| CompileError::UnknownOperator {
            subject: leaf.subject.clone(),
            operator,
        })?,
    };
    if !kind.supports(operator) {
        return Err(CompileError::OperatorNotApplicable {
            subject: leaf.subject.clone(),
            operator: operator.to_string(),
            subject_type: kind.name(),
        });
    }

    let subject_path = leaf.subject.as_str();
    let operand = match (operator.takes_list(), value) {
        (true, ConditionValue::List(items)) => compile_list(subject_path, kind, items)?,
        (true, ConditionValue::Scalar(_)) => {
            return Err(CompileError::ExpectedList {
                subject: leaf.subject.clone(),
                operator: operator.to_string(),
            });
        }
        (false, ConditionValue::List(_)) => {
            return Err(CompileError::ExpectedScalar {
                subject: leaf.subject.clone(),
                operator: operator.to_string(),
            });
        }
        (false, ConditionValue::Scalar(literal)) if operator == Operator::Matches => {
            Operand::Pattern(compile_regex(&literal_text(literal))?)
        }
        (false, ConditionValue::Scalar(literal)) => compile_scalar(subject_path, kind, literal)?,
    };

    Ok(CompiledLeaf {
        subject,
        operator,
        operand,
    })
}

fn compile_scalar(subject: &str, kind: SubjectType, literal: &Literal) -> Result<Operand, CompileError> {
    Ok(match kind {
        SubjectType::String => Operand::Text(literal_text(literal).to_ascii_lowercase()),
        SubjectType::Number => Operand::Number(number(subject, literal)?),
        SubjectType::Duration => Operand::Number(duration_ms(subject, literal)?),
        SubjectType::Bool => Operand::Bool(boolean(subject, literal)?),
    })
}

fn compile_list(subject: &str, kind: SubjectType, items: &[Literal]) -> Result<Operand, CompileError> {
    Ok(match kind {
        SubjectType::String => Operand::TextList(
            items
                .iter()
                .map(|item| literal_text(item).to_ascii_lowercase())
                .collect(),
        ),
        SubjectType::Number => Operand::NumberList(
            items
                .iter()
                .map(|item| number(subject, item))
                .collect::<Result<_, _>>()?,
        ),
        SubjectType::Duration => Operand::NumberList(
            items
                .iter()
                .map(|item| duration_ms(subject, item))
                .collect::<Result<_, _>>()?,
        ),
        // Bool subjects never reach here: `in` is rejected for them above.
        SubjectType::Bool => {
            return Err(CompileError::OperatorNotApplicable {
                subject: subject.to_owned(),
                operator: Operator::In.to_string(),
                subject_type: kind.name(),
            });
        }
    })
}

fn literal_text(literal: &Literal) -> String {
    match literal {
        Literal::String(s) => s.clone(),
        Literal::Number(n) => n.to_string(),
        Literal::Bool(b) => b.to_string(),
    }
}

fn invalid_value(subject: &str, literal: &Literal, expected: &'static str) -> CompileError {
    CompileError::InvalidValue {
        subject: subject.to_owned(),
        value: literal.to_string(),
        expected,
    }
}

fn number(subject: &str, literal: &Literal) -> Result<f64, CompileError> {
    match literal {
        Literal::Number(n) => Ok(*n),
        Literal::String(s) => s
            .trim()
            .parse()
            .map_err(|_| invalid_value(subject, literal, "number")),
        Literal::Bool(_) => Err(invalid_value(subject, literal, "number")),
    }
}

#[allow(clippy::cast_precision_loss)]
fn duration_ms(subject: &str, literal: &Literal) -> Result<f64, CompileError> {
    let invalid = || CompileError::InvalidDuration {
        subject: subject.to_owned(),
        value: literal_text(literal),
    };
    match literal {
        Literal::Number(n) => Ok(*n),
        Literal::String(s) => parse_duration_ms(s)
            .map(|ms| ms as f64)
            .or_else(|_| s.trim().parse::<f64>())
            .map_err(|_| invalid()),
        Literal::Bool(_) => Err(invalid()),
    }
}

fn boolean(subject: &str, literal: &Literal) -> Result<bool, CompileError> {
    match literal {
        Literal::Bool(b) => Ok(*b),
        Literal::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Literal::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(invalid_value(subject, literal, "bool")),
    }
}

/// Flags honored in a `/pattern/flags` literal.
const REGEX_FLAGS: &str = "imsx";
/// JavaScript flags with no meaning for a single test. Accepted and dropped.
const IGNORED_REGEX_FLAGS: &str = "guy";

/// Split `/pattern/flags` into pattern and honored flags. Anything not in
/// that shape is a bare pattern. A letter suffix is always read as flags,
/// so an unknown flag fails instead of becoming part of the pattern.
fn split_regex_literal(raw: &str) -> Result<(&str, String), CompileError> {
    let Some((pattern, suffix)) = raw
        .strip_prefix('/')
        .and_then(|rest| rest.rfind('/').map(|end| (&rest[..end], &rest[end + 1..])))
        .filter(|(_, suffix)| suffix.chars().all(|c| c.is_ascii_alphabetic()))
    else {
        return Ok((raw, String::new()));
    };

    if let Some(unknown) = suffix
        .chars()
        .find(|c| !REGEX_FLAGS.contains(*c) && !IGNORED_REGEX_FLAGS.contains(*c))
    {
        return Err(CompileError::InvalidRegex {
            pattern: raw.to_owned(),
            message: format!("unsupported flag '{unknown}'"),
        });
    }
    let flags = suffix.chars().filter(|c| REGEX_FLAGS.contains(*c)).collect();
    Ok((pattern, flags))
}

fn compile_regex(raw: &str) -> Result<Regex, CompileError> {
    let (pattern, flags) = split_regex_literal(raw)?;
    RegexBuilder::new(pattern)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .ignore_whitespace(flags.contains('x'))
        .build()
        .map_err(|e| CompileError::InvalidRegex {
            pattern: raw.to_owned(),
            message: e.to_string(),
        })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
