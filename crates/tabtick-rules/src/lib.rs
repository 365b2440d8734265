//! # tabtick-rules
//!
//! The rule engine: evaluate user-defined conditions over a tab collection
//! and run validated, priority-ordered actions on every match.
//!
//! Pipeline for one run:
//!
//! 1. [`indices`]: derive domain, origin, dedup key, category, and age for
//!    each tab and group tabs by those keys
//! 2. [`predicate`]: compile each rule's [`Condition`] into a [`Predicate`]
//! 3. [`evaluator`]: apply the predicate to every tab, producing the match set
//! 4. [`actions`]: validate the action list and sort it by priority
//! 5. [`executor`]: run the actions through the [`collaborators`]
//! 6. [`runner`]: repeat for every rule and aggregate a [`RunReport`]
//!
//! Errors are recovered at the smallest scope (tab, then rule) and reported
//! as data. Only [`compile`] and [`validate_rule`] return hard failures.

#![deny(unsafe_code)]

pub mod actions;
pub mod collaborators;
pub mod condition;
pub mod errors;
pub mod evaluator;
pub mod executor;
pub mod indices;
pub mod predicate;
pub mod rule;
pub mod runner;

pub use actions::{
    Action, ActionKind, ActionListValidation, GroupBy, get_compatible_actions,
    sort_actions_by_priority, validate_action_list,
};
pub use collaborators::{BookmarkService, Collaborators, Scope, SnoozeService, TabMutator, TabSource};
pub use condition::{Condition, ConditionValue, Leaf, Literal, Operator};
pub use errors::{ActionError, BrowserError, CompileError, EvaluationError, RuleError};
pub use evaluator::{EvaluateOptions, EvaluationContext, RuleEvaluation, evaluate_rule};
pub use executor::{ActionResult, ExecutionContext, execute_actions};
pub use indices::{IndexBuilder, Indices, build_indices};
pub use predicate::{Predicate, compile};
pub use rule::{Rule, RuleFlags, Trigger, parse_rules};
pub use runner::{
    PreviewMatch, PreviewReport, RuleFailure, RuleReport, RuleRunner, RunOptions, RunReport,
    preview_rule_indexed, validate_rule,
};
