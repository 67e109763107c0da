use serde::{Deserialize, Serialize};
use std::io::Read;

use super::banding::DelinquencyState;
use super::graph::StrategyLoadError;
use crate::accounts::Account;

/// Outcome used when a custom rule list has no catch-all and nothing matched.
pub const DEFAULT_RULE_PRIORITY: u8 = 5;
pub const DEFAULT_RULE_ACTION: &str = "Review Required";

/// Account figure a threshold is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    OutstandingBalance,
    DaysInArrears,
}

impl Metric {
    fn read(&self, account: &Account) -> Option<f64> {
        match self {
            Metric::OutstandingBalance => account.outstanding_balance,
            Metric::DaysInArrears => account.days_in_arrears,
        }
    }
}

/// Single numeric comparison. Missing or NaN figures never satisfy it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Threshold {
    GreaterThan { metric: Metric, value: f64 },
    AtMost { metric: Metric, value: f64 },
}

impl Threshold {
    pub fn holds(&self, account: &Account) -> bool {
        match self {
            Threshold::GreaterThan { metric, value } => metric
                .read(account)
                .map(|actual| actual > *value)
                .unwrap_or(false),
            Threshold::AtMost { metric, value } => metric
                .read(account)
                .map(|actual| actual <= *value)
                .unwrap_or(false),
        }
    }
}

/// Ordered classifier entry. An empty `conditions` list always matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub conditions: Vec<Threshold>,
    pub priority: u8,
    pub next_action: String,
}

impl Rule {
    pub fn matches(&self, account: &Account) -> bool {
        self.conditions
            .iter()
            .all(|threshold| threshold.holds(account))
    }

    pub fn is_catch_all(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// Classifier output; `rule_id` is `None` only when the default outcome applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub rule_id: Option<String>,
    pub priority: u8,
    pub next_action: String,
    pub delinquency_state: DelinquencyState,
}

/// First-match rule list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Reads a JSON array of rules.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, StrategyLoadError> {
        let rules: Vec<Rule> = serde_json::from_reader(reader)?;
        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Whether classification is total without relying on the default outcome.
    pub fn has_catch_all(&self) -> bool {
        self.rules.last().map(Rule::is_catch_all).unwrap_or(false)
    }

    pub fn first_match(&self, account: &Account) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.matches(account))
    }

    pub fn classify(&self, account: &Account) -> Classification {
        let delinquency_state = DelinquencyState::from_days(account.days_in_arrears);

        match self.first_match(account) {
            Some(rule) => Classification {
                rule_id: Some(rule.id.clone()),
                priority: rule.priority,
                next_action: rule.next_action.clone(),
                delinquency_state,
            },
            None => Classification {
                rule_id: None,
                priority: DEFAULT_RULE_PRIORITY,
                next_action: DEFAULT_RULE_ACTION.to_string(),
                delinquency_state,
            },
        }
    }

    /// Balance and arrears tiers used by the collections queue.
    pub fn standard() -> Self {
        use Metric::{DaysInArrears as Days, OutstandingBalance as Balance};

        let balance_over = |value| Threshold::GreaterThan {
            metric: Balance,
            value,
        };
        let days_over = |value| Threshold::GreaterThan {
            metric: Days,
            value,
        };

        let rule = |id: &str, name: &str, conditions: Vec<Threshold>, priority, action: &str| Rule {
            id: id.to_string(),
            name: name.to_string(),
            conditions,
            priority,
            next_action: action.to_string(),
        };

        Self::new(vec![
            rule(
                "rule_001",
                "High Value Critical",
                vec![balance_over(500_000.0), days_over(60.0)],
                1,
                "Urgent Legal Review",
            ),
            rule(
                "rule_002",
                "High Value Severe",
                vec![balance_over(500_000.0), days_over(30.0)],
                1,
                "Senior Collector Call",
            ),
            rule(
                "rule_003",
                "High Value Early",
                vec![balance_over(500_000.0)],
                1,
                "Priority Phone Call",
            ),
            rule(
                "rule_004",
                "Medium Value Critical",
                vec![balance_over(100_000.0), days_over(90.0)],
                1,
                "Legal Review",
            ),
            rule(
                "rule_005",
                "Medium Value Severe",
                vec![balance_over(100_000.0), days_over(60.0)],
                2,
                "Urgent Phone Call",
            ),
            rule(
                "rule_006",
                "Medium Value Moderate",
                vec![balance_over(100_000.0), days_over(30.0)],
                2,
                "Phone Call - High Priority",
            ),
            rule(
                "rule_007",
                "Medium Value Early",
                vec![balance_over(100_000.0)],
                3,
                "Phone Call",
            ),
            rule(
                "rule_008",
                "Low Value Critical",
                vec![balance_over(10_000.0), days_over(120.0)],
                2,
                "Final Notice Letter",
            ),
            rule(
                "rule_009",
                "Low Value Severe",
                vec![balance_over(10_000.0), days_over(90.0)],
                3,
                "Phone Call",
            ),
            rule(
                "rule_010",
                "Low Value Moderate",
                vec![balance_over(10_000.0), days_over(60.0)],
                3,
                "Email Follow-up",
            ),
            rule(
                "rule_011",
                "Low Value Early",
                vec![balance_over(10_000.0), days_over(30.0)],
                4,
                "Email Reminder",
            ),
            rule(
                "rule_012",
                "Very Low Value",
                vec![
                    Threshold::AtMost {
                        metric: Balance,
                        value: 10_000.0,
                    },
                    days_over(90.0),
                ],
                4,
                "SMS Reminder",
            ),
            rule("rule_013", "Default Action", Vec::new(), 5, "Review Required"),
        ])
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::standard()
    }
}
