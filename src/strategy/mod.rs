//! Strategy evaluation engine.
//!
//! Two evaluators derive the same outputs for an account: the ordered
//! [`RuleSet`] classifier and the operator-authored [`StrategyGraph`]. Both
//! are pure; callers write the resulting [`AccountEvaluation`] back onto
//! their records.
//!
//! The two paths do not agree on priority polarity. Rules rank `1` as the
//! most urgent tier, while graph outcomes rank higher numbers (`8`, `9`) as
//! more urgent. Every evaluation carries a [`PriorityScale`] so downstream
//! consumers can order a mixed queue correctly.

mod banding;
pub mod condition;
pub mod graph;
pub mod interpreter;
pub mod library;
pub mod rules;

pub use banding::DelinquencyState;
pub use condition::{evaluate_condition, AttributeValue};
pub use graph::{
    ActionData, ActionPriority, ConditionData, ConditionField, ConditionOperator, ConditionValue,
    Connection, EndData, EscalationData, GraphEditError, GraphIssue, NodeId, NodeKind, NodeType, Position,
    StrategyGraph, StrategyLoadError, StrategyNode, TimerData,
};
pub use interpreter::{evaluate, StrategyOutcome};
pub use library::{SavedStrategy, StrategyDraft, StrategyLibrary, StrategyLibraryError, StrategyStatus};
pub use rules::{Classification, Metric, Rule, RuleSet, Threshold};

use serde::{Deserialize, Serialize};

use crate::accounts::Account;

/// Direction in which a priority number expresses urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityScale {
    /// `1` is the most urgent tier (rule classifier).
    LowerIsUrgent,
    /// Larger numbers are more urgent (strategy graphs).
    HigherIsUrgent,
}

/// Derived fields written back onto an account after evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEvaluation {
    pub priority: i32,
    pub next_action: String,
    pub delinquency_state: DelinquencyState,
    pub priority_scale: PriorityScale,
}

/// Anything that can derive the recommended action for a single account.
pub trait AccountEvaluator {
    fn evaluate_account(&self, account: &Account) -> AccountEvaluation;
}

/// The strategy currently driving a collection queue.
#[derive(Debug, Clone)]
pub enum Strategy {
    Rules(RuleSet),
    Graph(StrategyGraph),
}

impl Strategy {
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::Rules(_) => "rules",
            Strategy::Graph(_) => "graph",
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Rules(RuleSet::standard())
    }
}

impl AccountEvaluator for Strategy {
    fn evaluate_account(&self, account: &Account) -> AccountEvaluation {
        match self {
            Strategy::Rules(rules) => rules.evaluate_account(account),
            Strategy::Graph(graph) => graph.evaluate_account(account),
        }
    }
}

impl AccountEvaluator for RuleSet {
    fn evaluate_account(&self, account: &Account) -> AccountEvaluation {
        let classification = self.classify(account);
        AccountEvaluation {
            priority: i32::from(classification.priority),
            next_action: classification.next_action,
            delinquency_state: classification.delinquency_state,
            priority_scale: PriorityScale::LowerIsUrgent,
        }
    }
}

impl AccountEvaluator for StrategyGraph {
    fn evaluate_account(&self, account: &Account) -> AccountEvaluation {
        let outcome = evaluate(self, account);
        AccountEvaluation {
            priority: outcome.priority,
            next_action: outcome.action,
            delinquency_state: DelinquencyState::from_days(account.days_in_arrears),
            priority_scale: PriorityScale::HigherIsUrgent,
        }
    }
}
