//! Rule model.

use serde::{Deserialize, Serialize};

use crate::actions::Action;
use crate::condition::Condition;

/// A user-defined rule: a condition plus the actions to run on matches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Stable identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Disabled rules are skipped by the runner but remain previewable.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Match condition.
    pub when: Condition,
    /// Actions run on every matching tab.
    #[serde(default)]
    pub then: Vec<Action>,
    /// When the rule fires. Carried as data only.
    #[serde(default)]
    pub trigger: Trigger,
    /// Authoring priority. Carried as data; rules run in input order.
    #[serde(default)]
    pub priority: i32,
    /// Evaluation switches.
    #[serde(default)]
    pub flags: RuleFlags,
}

fn default_enabled() -> bool {
    true
}

impl Rule {
    /// Enabled rule with no actions.
    pub fn new(id: impl Into<String>, name: impl Into<String>, when: Condition) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            enabled: true,
            when,
            then: Vec::new(),
            trigger: Trigger::default(),
            priority: 0,
            flags: RuleFlags::default(),
        }
    }

    /// Builder: set the action list.
    #[must_use]
    pub fn with_actions(mut self, actions: Vec<Action>) -> Self {
        self.then = actions;
        self
    }

    /// Builder: set `enabled`.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Name if set, otherwise the id.
    pub fn label(&self) -> &str {
        if self.name.is_empty() { &self.id } else { &self.name }
    }
}

/// Per-rule evaluation switches.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleFlags {
    /// Evaluate pinned tabs even when the run skips them.
    pub include_pinned: bool,
}

/// When a rule fires. Scheduling is the host's concern.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Only on explicit request.
    #[default]
    Manual,
    /// Whenever the tab set changes.
    Immediate,
    /// On a fixed interval, e.g. `"30m"`.
    Repeat {
        /// Interval literal.
        every: String,
    },
    /// Once at an epoch-ms timestamp.
    Once {
        /// Fire time (epoch ms).
        at: i64,
    },
}

/// Parse a JSON array of rules.
pub fn parse_rules(json: &str) -> serde_json::Result<Vec<Rule>> {
    serde_json::from_str(json)
}
