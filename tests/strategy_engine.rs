//! End-to-end scenarios for both evaluation paths, driven through the public
//! strategy and accounts API only.

use collections_strategy::accounts::{reapply_all, reapply_with_summary, Account};
use collections_strategy::strategy::{
    evaluate, AccountEvaluator, Connection, DelinquencyState, GraphIssue, NodeId, NodeKind,
    NodeType, PriorityScale, RuleSet, Strategy, StrategyGraph,
};

const QUEUE_STRATEGY: &str = r#"{
    "nodes": [
        {
            "id": "block_1",
            "type": "condition",
            "position": {"x": 100, "y": 80},
            "data": {"title": "Over 30 days", "field": "days_past_due", "operator": "greater_than", "value": "30"},
            "connections": [{"targetId": "block_2"}, {"targetId": "block_3"}]
        },
        {
            "id": "block_2",
            "type": "condition",
            "data": {"title": "Large balance", "field": "current_balance", "operator": "greater_than", "value": 10000},
            "connections": [{"targetId": "block_5", "label": "yes"}, {"targetId": "block_4", "label": "no"}]
        },
        {
            "id": "block_3",
            "type": "timer",
            "data": {"title": "Grace period", "duration": 7, "unit": "days"},
            "connections": [{"targetId": "block_4"}]
        },
        {
            "id": "block_4",
            "type": "action",
            "data": {"title": "Reminder", "actionType": "email", "priority": "low", "template": "reminder_1"},
            "connections": []
        },
        {
            "id": "block_5",
            "type": "escalation",
            "data": {"title": "Legal", "escalationType": "legal_team", "threshold": 3, "reason": "High balance"},
            "connections": []
        }
    ]
}"#;

fn account(id: &str, balance: Option<f64>, days: Option<f64>) -> Account {
    let mut account = Account::new(id, format!("ACC-{id}"));
    account.customer_name = format!("Customer {id}");
    account.outstanding_balance = balance;
    account.days_in_arrears = days;
    account
}

fn queue_strategy() -> StrategyGraph {
    serde_json::from_str(QUEUE_STRATEGY).expect("strategy parses")
}

#[test]
fn authored_strategy_routes_each_account() {
    let graph = queue_strategy();
    assert!(graph.validate().is_empty());

    let escalated = evaluate(&graph, &account("1", Some(25_000.0), Some(45.0)));
    assert_eq!(escalated.action, "Escalate to legal_team");
    assert_eq!(escalated.priority, 9);

    let reminded = evaluate(&graph, &account("2", Some(2_000.0), Some(45.0)));
    assert_eq!(reminded.action, "email - Reminder");
    assert_eq!(reminded.priority, 2);

    let waiting = evaluate(&graph, &account("3", Some(25_000.0), Some(5.0)));
    assert_eq!(waiting.action, "Wait 7 days");
    assert_eq!(waiting.priority, 3);
}

#[test]
fn accounts_without_figures_take_false_branches() {
    let graph = queue_strategy();
    let outcome = evaluate(&graph, &account("blank", None, None));
    assert_eq!(outcome.action, "Wait 7 days");

    let evaluation = graph.evaluate_account(&account("blank", None, None));
    assert_eq!(evaluation.delinquency_state, DelinquencyState::Critical);
    assert_eq!(evaluation.priority_scale, PriorityScale::HigherIsUrgent);
}

#[test]
fn rules_and_graph_share_the_batch_path() {
    let accounts = vec![
        account("1", Some(600_000.0), Some(70.0)),
        account("2", Some(50_000.0), Some(95.0)),
        account("3", Some(500.0), Some(0.0)),
    ];

    let by_rules = reapply_all(&accounts, &Strategy::Rules(RuleSet::standard()));
    assert_eq!(by_rules[0].next_action.as_deref(), Some("Urgent Legal Review"));
    assert_eq!(by_rules[0].priority, Some(1));
    assert_eq!(by_rules[0].delinquency_state, Some(DelinquencyState::Severe));
    assert_eq!(by_rules[1].next_action.as_deref(), Some("Phone Call"));
    assert_eq!(by_rules[1].delinquency_state, Some(DelinquencyState::Critical));
    assert_eq!(by_rules[2].next_action.as_deref(), Some("Review Required"));
    assert_eq!(by_rules[2].delinquency_state, Some(DelinquencyState::Current));

    let (by_graph, summary) = reapply_with_summary(&by_rules, &Strategy::Graph(queue_strategy()));
    assert_eq!(summary.evaluated, 3);
    assert_eq!(summary.changed, 3);
    assert_eq!(
        by_graph[0].next_action.as_deref(),
        Some("Escalate to legal_team")
    );
    for (before, after) in by_rules.iter().zip(&by_graph) {
        assert_eq!(before.customer_name, after.customer_name);
        assert_eq!(before.outstanding_balance, after.outstanding_balance);
        assert_eq!(before.days_in_arrears, after.days_in_arrears);
    }

    let (again, summary) = reapply_with_summary(&by_graph, &Strategy::Graph(queue_strategy()));
    assert_eq!(again, by_graph);
    assert_eq!(summary.changed, 0);
}

#[test]
fn editing_a_graph_keeps_evaluation_total() {
    let mut graph = queue_strategy();

    graph
        .remove_node(&NodeId::new("block_5"))
        .expect("node exists");
    assert!(graph
        .nodes()
        .iter()
        .all(|node| node.connections.iter().all(|conn| conn.target_id.0 != "block_5")));

    let outcome = evaluate(&graph, &account("1", Some(25_000.0), Some(45.0)));
    assert_eq!(outcome.action, "No next action");
    assert_eq!(outcome.priority, 1);

    let added = graph.add_node(NodeType::End, None);
    graph
        .connect(&NodeId::new("block_2"), &added, Some("true".to_string()))
        .expect("both nodes exist");
    let outcome = evaluate(&graph, &account("1", Some(25_000.0), Some(45.0)));
    assert!(outcome.action.starts_with("End: "));

    assert!(graph
        .update_node(&NodeId::new("missing"), NodeKind::default_for(NodeType::Timer))
        .is_err());
}

#[test]
fn loops_back_to_the_entry_are_reported_and_broken() {
    let mut graph = queue_strategy();
    graph
        .connect(&NodeId::new("block_4"), &NodeId::new("block_1"), None)
        .expect("both nodes exist");

    assert!(graph
        .validate()
        .iter()
        .any(|issue| matches!(issue, GraphIssue::NoEntryNode)));
    assert_eq!(
        evaluate(&graph, &account("1", Some(1.0), Some(45.0))).action,
        "No strategy defined"
    );
}

#[test]
fn bare_node_arrays_and_unknown_types_load() {
    let graph: StrategyGraph = serde_json::from_str(
        r#"[
            {"id": "hook", "type": "webhook", "data": {"url": "https://example.test"},
             "connections": [{"targetId": "done"}]},
            {"id": "done", "type": "end", "data": {"title": "Done", "outcome": "resolved"}}
        ]"#,
    )
    .expect("bare array parses");

    assert_eq!(evaluate(&graph, &account("1", None, None)).action, "Unknown action");
    assert!(graph.validate().contains(&GraphIssue::UnknownNodeType {
        node: NodeId::new("hook"),
        node_type: "webhook".to_string(),
    }));

    let json = serde_json::to_value(&graph).expect("serializes");
    assert_eq!(json["nodes"][0]["type"], "webhook");
    assert_eq!(json["nodes"][0]["data"]["url"], "https://example.test");
    assert_eq!(json["nodes"][0]["connections"][0]["targetId"], "done");
}

#[test]
fn labeled_connection_constructor_matches_json_labels() {
    let labeled = Connection::branch_to("next", false);
    assert_eq!(labeled.branch(), Some(false));
    let parsed: Connection =
        serde_json::from_str(r#"{"targetId": "next", "label": "no"}"#).expect("parses");
    assert_eq!(parsed.branch(), Some(false));
}
