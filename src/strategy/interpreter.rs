use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use super::condition::evaluate_condition;
use super::graph::{NodeId, NodeKind, StrategyGraph, StrategyNode};
use crate::accounts::Account;

pub const NO_STRATEGY_ACTION: &str = "No strategy defined";
pub const NO_NEXT_ACTION: &str = "No next action";
pub const CYCLE_ACTION: &str = "Cycle detected";
pub const UNKNOWN_ACTION: &str = "Unknown action";

const MINIMAL_PRIORITY: i32 = 1;
const TIMER_PRIORITY: i32 = 3;
const ESCALATION_PRIORITY: i32 = 9;
const END_PRIORITY: i32 = 1;

/// Recommendation reached by walking a strategy graph; higher priority is
/// more urgent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyOutcome {
    pub action: String,
    pub priority: i32,
}

impl StrategyOutcome {
    fn fallback(action: &str) -> Self {
        Self {
            action: action.to_string(),
            priority: MINIMAL_PRIORITY,
        }
    }
}

/// Walks the graph from its entry node for one account.
///
/// Total: empty or fully cyclic graphs, missing branches, dangling targets
/// and revisited nodes all end in a fallback outcome.
pub fn evaluate(graph: &StrategyGraph, account: &Account) -> StrategyOutcome {
    let Some(entry) = graph.entry_node() else {
        debug!(account = %account.id, "strategy graph has no entry node");
        return StrategyOutcome::fallback(NO_STRATEGY_ACTION);
    };

    let mut visited: HashSet<&NodeId> = HashSet::new();
    let mut current = entry;

    loop {
        if !visited.insert(&current.id) {
            debug!(account = %account.id, node = %current.id, "strategy graph cycle broken");
            return StrategyOutcome::fallback(CYCLE_ACTION);
        }

        let data = match &current.kind {
            NodeKind::Condition(data) => data,
            terminal => return terminal_outcome(terminal),
        };

        let outcome = evaluate_condition(account, data);
        match next_node(graph, current, outcome) {
            Some(next) => current = next,
            None => return StrategyOutcome::fallback(NO_NEXT_ACTION),
        }
    }
}

/// Branch target for a condition result. A connection labeled with the
/// outcome wins; otherwise the unlabeled connection at the outcome's position
/// (0 true, 1 false) is taken.
fn next_node<'g>(
    graph: &'g StrategyGraph,
    node: &'g StrategyNode,
    outcome: bool,
) -> Option<&'g StrategyNode> {
    let connection = match node
        .connections
        .iter()
        .find(|conn| conn.branch() == Some(outcome))
    {
        Some(conn) => conn,
        None => node
            .connections
            .get(if outcome { 0 } else { 1 })
            .filter(|conn| conn.branch().is_none())?,
    };

    graph.node(&connection.target_id)
}

fn terminal_outcome(kind: &NodeKind) -> StrategyOutcome {
    match kind {
        NodeKind::Action(data) => StrategyOutcome {
            action: format!("{} - {}", data.action_type, data.title),
            priority: data.priority.score(),
        },
        NodeKind::Timer(data) => StrategyOutcome {
            action: format!("Wait {} {}", data.duration, data.unit),
            priority: TIMER_PRIORITY,
        },
        NodeKind::Escalation(data) => StrategyOutcome {
            action: format!("Escalate to {}", data.escalation_type),
            priority: ESCALATION_PRIORITY,
        },
        NodeKind::End(data) => StrategyOutcome {
            action: format!("End: {}", data.outcome),
            priority: END_PRIORITY,
        },
        NodeKind::Unknown { .. } => StrategyOutcome::fallback(UNKNOWN_ACTION),
        NodeKind::Condition(_) => StrategyOutcome::fallback(NO_NEXT_ACTION),
    }
}
