//! Declarative authorization policy.
//!
//! ```yaml
//! default: allow
//! rules:
//!   - action: read
//!     table: secrets
//!     column: "ssn"
//!     decision: ignore
//!   - action: [delete, drop_table]
//!     decision: deny
//! ```
//!
//! Rules are checked in order and the first match decides. Patterns are
//! case-insensitive globs because SQLite identifiers are. A rule field that
//! is set never matches a request where that argument is absent, except
//! `accessor: "-"`, which matches only direct access (no trigger or view).

use crate::action::ActionCode;
use crate::authorizer::Authorizer;
use crate::decision::Decision;
use crate::error::PolicyError;
use crate::request::AuthRequest;
use globset::{GlobBuilder, GlobMatcher};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Accessor pattern that matches only direct access.
pub const DIRECT_ACCESS: &str = "-";

/// User-facing policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySpec {
    #[serde(default = "default_decision")]
    pub default: Decision,

    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

fn default_decision() -> Decision {
    Decision::Allow
}

impl Default for PolicySpec {
    fn default() -> Self {
        Self {
            default: default_decision(),
            rules: Vec::new(),
        }
    }
}

/// One or more action names; `"*"` means any action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionList {
    One(String),
    Many(Vec<String>),
}

impl Default for ActionList {
    fn default() -> Self {
        ActionList::One("*".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    #[serde(default)]
    pub action: ActionList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessor: Option<String>,
    pub decision: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RuleSpec {
    pub fn new(decision: Decision) -> Self {
        Self {
            action: ActionList::default(),
            table: None,
            column: None,
            database: None,
            accessor: None,
            decision,
            reason: None,
        }
    }

    pub fn on(mut self, action: ActionCode) -> Self {
        let name = action.as_str().to_string();
        self.action = match self.action {
            ActionList::One(existing) if existing != "*" => ActionList::Many(vec![existing, name]),
            ActionList::One(_) => ActionList::One(name),
            ActionList::Many(mut names) => {
                names.push(name);
                ActionList::Many(names)
            }
        };
        self
    }

    pub fn table(mut self, pattern: impl Into<String>) -> Self {
        self.table = Some(pattern.into());
        self
    }

    pub fn column(mut self, pattern: impl Into<String>) -> Self {
        self.column = Some(pattern.into());
        self
    }

    pub fn database(mut self, pattern: impl Into<String>) -> Self {
        self.database = Some(pattern.into());
        self
    }

    pub fn accessor(mut self, pattern: impl Into<String>) -> Self {
        self.accessor = Some(pattern.into());
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[derive(Debug, Clone)]
enum AccessorMatch {
    Any,
    DirectOnly,
    Glob(GlobMatcher),
}

/// A rule with parsed actions and compiled patterns.
#[derive(Debug, Clone)]
pub struct Rule {
    index: usize,
    actions: Option<BTreeSet<ActionCode>>,
    table: Option<GlobMatcher>,
    column: Option<GlobMatcher>,
    database: Option<GlobMatcher>,
    accessor: AccessorMatch,
    decision: Decision,
    reason: Option<String>,
}

impl Rule {
    fn compile(index: usize, spec: &RuleSpec) -> Result<Self, PolicyError> {
        let names: Vec<&str> = match &spec.action {
            ActionList::One(name) => vec![name.as_str()],
            ActionList::Many(names) => names.iter().map(String::as_str).collect(),
        };
        if names.is_empty() {
            return Err(PolicyError::EmptyRule { index });
        }
        let actions = if names.iter().any(|n| n.trim() == "*") {
            None
        } else {
            let parsed = names
                .iter()
                .map(|n| n.parse::<ActionCode>())
                .collect::<Result<BTreeSet<_>, _>>()
                .map_err(|source| PolicyError::UnknownAction { index, source })?;
            Some(parsed)
        };

        let accessor = match spec.accessor.as_deref() {
            None => AccessorMatch::Any,
            Some(DIRECT_ACCESS) => AccessorMatch::DirectOnly,
            Some(pattern) => AccessorMatch::Glob(compile_glob(index, "accessor", pattern)?),
        };

        Ok(Self {
            index,
            actions,
            table: compile_opt(index, "table", spec.table.as_deref())?,
            column: compile_opt(index, "column", spec.column.as_deref())?,
            database: compile_opt(index, "database", spec.database.as_deref())?,
            accessor,
            decision: spec.decision,
            reason: spec.reason.clone(),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn decision(&self) -> Decision {
        self.decision
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn matches(&self, request: &AuthRequest<'_>) -> bool {
        if let Some(actions) = &self.actions {
            if !actions.contains(&request.action) {
                return false;
            }
        }
        if !field_matches(self.table.as_ref(), request.table())
            || !field_matches(self.column.as_ref(), request.column())
            || !field_matches(self.database.as_ref(), request.database())
        {
            return false;
        }
        match &self.accessor {
            AccessorMatch::Any => true,
            AccessorMatch::DirectOnly => request.accessor().is_none(),
            AccessorMatch::Glob(glob) => request.accessor().is_some_and(|a| glob.is_match(a)),
        }
    }
}

fn field_matches(pattern: Option<&GlobMatcher>, value: Option<&str>) -> bool {
    match (pattern, value) {
        (None, _) => true,
        (Some(glob), Some(value)) => glob.is_match(value),
        (Some(_), None) => false,
    }
}

fn compile_glob(index: usize, field: &'static str, pattern: &str) -> Result<GlobMatcher, PolicyError> {
    GlobBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| PolicyError::InvalidPattern {
            index,
            field,
            pattern: pattern.to_string(),
            message: e.kind().to_string(),
        })
}

fn compile_opt(
    index: usize,
    field: &'static str,
    pattern: Option<&str>,
) -> Result<Option<GlobMatcher>, PolicyError> {
    pattern.map(|p| compile_glob(index, field, p)).transpose()
}

/// Compiled, immutable policy.
#[derive(Debug, Clone)]
pub struct Policy {
    default: Decision,
    rules: Vec<Rule>,
}

impl Policy {
    pub fn from_spec(spec: &PolicySpec) -> Result<Self, PolicyError> {
        let rules = spec
            .rules
            .iter()
            .enumerate()
            .map(|(index, rule)| Rule::compile(index, rule))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            default: spec.default,
            rules,
        })
    }

    /// Policy with no rules and the given fallback.
    pub fn with_default(default: Decision) -> Self {
        Self {
            default,
            rules: Vec::new(),
        }
    }

    pub fn default_decision(&self) -> Decision {
        self.default
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// First rule matching `request`, if any.
    pub fn matching_rule(&self, request: &AuthRequest<'_>) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.matches(request))
    }

    pub fn evaluate(&self, request: &AuthRequest<'_>) -> Decision {
        match self.matching_rule(request) {
            Some(rule) => {
                tracing::debug!(
                    event = "policy_rule_matched",
                    rule = rule.index(),
                    action = %request.action,
                    decision = %rule.decision()
                );
                rule.decision()
            }
            None => self.default_decision(),
        }
    }

    pub fn into_authorizer(self) -> PolicyAuthorizer {
        PolicyAuthorizer::new(Arc::new(self))
    }
}

/// [`Authorizer`] backed by a shared [`Policy`].
///
/// Cloning is cheap, so one policy can guard many connections.
#[derive(Debug, Clone)]
pub struct PolicyAuthorizer {
    policy: Arc<Policy>,
}

impl PolicyAuthorizer {
    pub fn new(policy: Arc<Policy>) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }
}

impl Authorizer for PolicyAuthorizer {
    fn authorize(&mut self, request: &AuthRequest<'_>) -> Decision {
        self.policy.evaluate(request)
    }
}
