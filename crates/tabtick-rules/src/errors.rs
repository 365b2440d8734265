//! Error taxonomy for the rule engine.
//!
//! Errors are recovered at the smallest enclosing scope (tab → rule → run)
//! and surfaced as data in results and reports. Only [`CompileError`] and
//! [`RuleError::ActionListInvalid`] escape to callers that compile or
//! validate rules outside the runner.

use tabtick_core::TabId;
use thiserror::Error;

/// A condition tree that cannot be compiled into a predicate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Subject path does not name a known field.
    #[error("unknown subject '{subject}'")]
    UnknownSubject {
        /// The path as written in the rule.
        subject: String,
    },

    /// Operator name is not recognized.
    #[error("unknown operator '{operator}' on '{subject}'")]
    UnknownOperator {
        /// Subject path.
        subject: String,
        /// The operator as written.
        operator: String,
    },

    /// Operator is not defined for the subject's type.
    #[error("operator '{operator}' is not applicable to {subject_type} subject '{subject}'")]
    OperatorNotApplicable {
        /// Subject path.
        subject: String,
        /// Operator name.
        operator: String,
        /// Declared subject type (`string`, `number`, `duration`, `bool`).
        subject_type: &'static str,
    },

    /// Leaf has a value but no operator, or an operator but no value.
    #[error("subject '{subject}' needs both an operator and a value")]
    MissingOperator {
        /// Subject path.
        subject: String,
    },

    /// `in`/`not_in` was given a scalar.
    #[error("operator '{operator}' on '{subject}' requires a list value")]
    ExpectedList {
        /// Subject path.
        subject: String,
        /// Operator name.
        operator: String,
    },

    /// A scalar operator was given a list.
    #[error("operator '{operator}' on '{subject}' requires a single value")]
    ExpectedScalar {
        /// Subject path.
        subject: String,
        /// Operator name.
        operator: String,
    },

    /// Regex value failed to parse.
    #[error("invalid regex '{pattern}': {message}")]
    InvalidRegex {
        /// Pattern as written.
        pattern: String,
        /// Parser message.
        message: String,
    },

    /// Duration value is neither `<int><unit>` nor a number.
    #[error("invalid duration '{value}' for '{subject}'")]
    InvalidDuration {
        /// Subject path.
        subject: String,
        /// Offending value.
        value: String,
    },

    /// Value literal does not fit the subject type.
    #[error("value {value} does not fit {expected} subject '{subject}'")]
    InvalidValue {
        /// Subject path.
        subject: String,
        /// Offending value, JSON-rendered.
        value: String,
        /// Expected type.
        expected: &'static str,
    },
}

/// A per-tab failure while building or evaluating one context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// Tab has no derived fields for the current pass.
    #[error("tab {tab_id} was not indexed before evaluation")]
    NotIndexed {
        /// Offending tab.
        tab_id: TabId,
    },
}

/// A failing collaborator call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrowserError {
    /// The tab no longer exists.
    #[error("tab {0} not found")]
    TabNotFound(TabId),

    /// Any other host failure.
    #[error("{operation} failed: {message}")]
    Failed {
        /// Collaborator operation name, e.g. `closeTab`.
        operation: String,
        /// Host-provided message.
        message: String,
    },

    /// Tab is active and cannot be discarded.
    #[error("tab {0} is active")]
    TabActive(TabId),
}

impl BrowserError {
    /// Shorthand for [`BrowserError::Failed`].
    pub fn failed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// A per-tab action failure. Recorded in the result list, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// `suspend` on the focused tab of its window.
    #[error("cannot suspend active tab {tab_id}")]
    CannotSuspendActiveTab {
        /// Offending tab.
        tab_id: TabId,
    },

    /// Action type this engine does not implement.
    #[error("unknown action type")]
    UnknownAction,

    /// A cached group disappeared or could not be resolved.
    #[error("group '{name}' not found")]
    GroupNotFound {
        /// Group key.
        name: String,
    },

    /// `snooze.for` does not parse.
    #[error("invalid snooze duration '{value}'")]
    InvalidDuration {
        /// Offending literal.
        value: String,
    },

    /// `group` with neither `name` nor `groupBy`.
    #[error("group action needs a name or groupBy")]
    MissingGroupKey,

    /// Collaborator call failed.
    #[error(transparent)]
    Collaborator(#[from] BrowserError),
}

impl ActionError {
    /// Stable machine code recorded in `ActionResult.error`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::CannotSuspendActiveTab { .. } | Self::Collaborator(BrowserError::TabActive(_)) => {
                "CannotSuspendActiveTab"
            }
            Self::UnknownAction => "UnknownAction",
            Self::GroupNotFound { .. } => "GroupNotFound",
            Self::InvalidDuration { .. } => "InvalidDuration",
            Self::MissingGroupKey => "MissingGroupKey",
            Self::Collaborator(_) => "CollaboratorFailed",
        }
    }
}

/// A rule-level failure: the rule is skipped, the run continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// The `when` tree does not compile.
    #[error("condition does not compile: {0}")]
    Compile(#[from] CompileError),

    /// The `then` list fails validation. No action has run.
    #[error("invalid action list: {}", errors.join("; "))]
    ActionListInvalid {
        /// Every validation message.
        errors: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_error_codes() {
        let tab_id = TabId::new(3);
        assert_eq!(
            ActionError::CannotSuspendActiveTab { tab_id }.code(),
            "CannotSuspendActiveTab"
        );
        assert_eq!(
            ActionError::Collaborator(BrowserError::TabActive(tab_id)).code(),
            "CannotSuspendActiveTab"
        );
        assert_eq!(ActionError::UnknownAction.code(), "UnknownAction");
        assert_eq!(
            ActionError::from(BrowserError::TabNotFound(tab_id)).code(),
            "CollaboratorFailed"
        );
    }

    #[test]
    fn messages() {
        let err = CompileError::OperatorNotApplicable {
            subject: "tab.pinned".into(),
            operator: "greater_than".into(),
            subject_type: "bool",
        };
        insta::assert_snapshot!(err.to_string(), @"operator 'greater_than' is not applicable to bool subject 'tab.pinned'");

        let err = RuleError::ActionListInvalid {
            errors: vec!["a".into(), "b".into()],
        };
        insta::assert_snapshot!(err.to_string(), @"invalid action list: a; b");
    }
}
