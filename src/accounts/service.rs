use chrono::Utc;
use serde::Serialize;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{info, warn};

use super::domain::{Account, AccountId};
use super::import::{merge_records, ImportRecord};
use super::reevaluate::reapply_with_summary;
use super::repository::{AccountRepository, RepositoryError};
use crate::strategy::{
    AccountEvaluation, AccountEvaluator, GraphIssue, RuleSet, SavedStrategy, Strategy,
    StrategyDraft, StrategyGraph, StrategyLibrary, StrategyLibraryError,
};

/// Outcome of one batch re-evaluation of the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReevaluationReport {
    pub strategy: String,
    pub strategy_id: Option<String>,
    pub evaluated: usize,
    pub changed: usize,
    pub triggered_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub received: usize,
    pub updated: usize,
    pub unmatched: Vec<String>,
    pub reevaluation: Option<ReevaluationReport>,
}

/// Evaluation of a draft graph against one account, with authoring issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyTestResult {
    pub account_id: AccountId,
    pub evaluation: AccountEvaluation,
    pub issues: Vec<GraphIssue>,
}

/// Service composing the account store, the standard rule set, and the
/// saved strategy library.
///
/// Every write to the queue runs under `writes`, so a read, re-evaluate,
/// replace cycle never interleaves with another.
pub struct CollectionsService<R> {
    repository: Arc<R>,
    rules: RuleSet,
    library: RwLock<StrategyLibrary>,
    writes: Mutex<()>,
}

impl<R> CollectionsService<R>
where
    R: AccountRepository + 'static,
{
    pub fn new(repository: Arc<R>, rules: RuleSet) -> Self {
        Self {
            repository,
            rules,
            library: RwLock::new(StrategyLibrary::new()),
            writes: Mutex::new(()),
        }
    }

    /// Strategy currently driving the queue: the active saved graph, or the
    /// rule set when none is active.
    pub fn active_strategy(&self) -> Result<(Strategy, Option<String>), CollectionsServiceError> {
        let library = self.library.read().map_err(|_| poisoned("strategy library"))?;
        Ok(match library.active() {
            Some(saved) => (Strategy::Graph(saved.graph.clone()), Some(saved.id.clone())),
            None => (Strategy::Rules(self.rules.clone()), None),
        })
    }

    pub fn accounts(&self) -> Result<Vec<Account>, CollectionsServiceError> {
        Ok(self.repository.all()?)
    }

    pub fn account(&self, id: &AccountId) -> Result<Account, CollectionsServiceError> {
        let account = self.repository.fetch(id)?.ok_or(RepositoryError::NotFound)?;
        Ok(account)
    }

    /// Replaces the queue with `accounts`, evaluated under the active strategy.
    pub fn load_accounts(
        &self,
        accounts: Vec<Account>,
        triggered_by: &str,
    ) -> Result<ReevaluationReport, CollectionsServiceError> {
        let _guard = self.writes.lock().map_err(|_| poisoned("queue writer"))?;
        self.reevaluate_locked(&accounts, triggered_by)
    }

    /// Re-runs the active strategy across the whole queue.
    pub fn apply_strategy(
        &self,
        triggered_by: &str,
    ) -> Result<ReevaluationReport, CollectionsServiceError> {
        let _guard = self.writes.lock().map_err(|_| poisoned("queue writer"))?;
        let accounts = self.repository.all()?;
        self.reevaluate_locked(&accounts, triggered_by)
    }

    /// Merges import rows into the queue; touched queues are re-evaluated
    /// before the merged collection is stored.
    pub fn import(
        &self,
        records: &[ImportRecord],
        triggered_by: &str,
    ) -> Result<ImportSummary, CollectionsServiceError> {
        let _guard = self.writes.lock().map_err(|_| poisoned("queue writer"))?;
        let current = self.repository.all()?;
        let merged = merge_records(&current, records);

        for number in &merged.unmatched {
            warn!(account_number = %number, triggered_by, "import row matched no account");
        }

        let reevaluation = if merged.updated > 0 {
            Some(self.reevaluate_locked(&merged.accounts, triggered_by)?)
        } else {
            None
        };

        Ok(ImportSummary {
            received: records.len(),
            updated: merged.updated,
            unmatched: merged.unmatched,
            reevaluation,
        })
    }

    pub fn list_strategies(&self) -> Result<Vec<SavedStrategy>, CollectionsServiceError> {
        let library = self.library.read().map_err(|_| poisoned("strategy library"))?;
        Ok(library.list().to_vec())
    }

    /// Saves a draft. Revising the active strategy re-evaluates the queue.
    pub fn save_strategy(
        &self,
        draft: StrategyDraft,
        triggered_by: &str,
    ) -> Result<SavedStrategy, CollectionsServiceError> {
        let _guard = self.writes.lock().map_err(|_| poisoned("queue writer"))?;
        let saved = {
            let mut library = self.library.write().map_err(|_| poisoned("strategy library"))?;
            library.save(draft, Utc::now())
        };
        info!(
            strategy_id = %saved.id,
            version = saved.version,
            status = saved.status.label(),
            triggered_by,
            "strategy saved"
        );

        if saved.status == crate::strategy::StrategyStatus::Active {
            let accounts = self.repository.all()?;
            self.reevaluate_locked(&accounts, triggered_by)?;
        }
        Ok(saved)
    }

    pub fn activate_strategy(
        &self,
        id: &str,
        triggered_by: &str,
    ) -> Result<(SavedStrategy, ReevaluationReport), CollectionsServiceError> {
        let _guard = self.writes.lock().map_err(|_| poisoned("queue writer"))?;
        let saved = {
            let mut library = self.library.write().map_err(|_| poisoned("strategy library"))?;
            library.activate(id, Utc::now())?.clone()
        };
        info!(strategy_id = %saved.id, triggered_by, "strategy activated");

        let accounts = self.repository.all()?;
        let report = self.reevaluate_locked(&accounts, triggered_by)?;
        Ok((saved, report))
    }

    /// Deactivates the active graph so the rule set drives the queue again.
    pub fn deactivate_strategy(
        &self,
        triggered_by: &str,
    ) -> Result<ReevaluationReport, CollectionsServiceError> {
        let _guard = self.writes.lock().map_err(|_| poisoned("queue writer"))?;
        let previous = {
            let mut library = self.library.write().map_err(|_| poisoned("strategy library"))?;
            library.deactivate(Utc::now())
        };
        if let Some(id) = &previous {
            info!(strategy_id = %id, triggered_by, "strategy deactivated");
        }

        let accounts = self.repository.all()?;
        self.reevaluate_locked(&accounts, triggered_by)
    }

    /// Evaluates `graph` against `account` without touching the queue.
    pub fn test_strategy(&self, graph: &StrategyGraph, account: &Account) -> StrategyTestResult {
        StrategyTestResult {
            account_id: account.id.clone(),
            evaluation: graph.evaluate_account(account),
            issues: graph.validate(),
        }
    }

    fn reevaluate_locked(
        &self,
        accounts: &[Account],
        triggered_by: &str,
    ) -> Result<ReevaluationReport, CollectionsServiceError> {
        let (strategy, strategy_id) = self.active_strategy()?;
        let (evaluated, summary) = reapply_with_summary(accounts, &strategy);
        self.repository.replace_all(evaluated)?;

        info!(
            strategy = strategy.label(),
            strategy_id = strategy_id.as_deref().unwrap_or("-"),
            evaluated = summary.evaluated,
            changed = summary.changed,
            triggered_by,
            "queue re-evaluated"
        );

        Ok(ReevaluationReport {
            strategy: strategy.label().to_string(),
            strategy_id,
            evaluated: summary.evaluated,
            changed: summary.changed,
            triggered_by: triggered_by.to_string(),
        })
    }
}

fn poisoned(what: &str) -> CollectionsServiceError {
    CollectionsServiceError::StatePoisoned(what.to_string())
}

/// Error raised by the collections service.
#[derive(Debug, thiserror::Error)]
pub enum CollectionsServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Library(#[from] StrategyLibraryError),
    #[error("{0} lock poisoned")]
    StatePoisoned(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::InMemoryAccountRepository;
    use crate::strategy::{
        ActionData, ActionPriority, ConditionData, ConditionField, ConditionOperator,
        ConditionValue, Connection, EndData, NodeKind, PriorityScale, StrategyNode,
    };

    fn account(id: &str, balance: f64, days: f64) -> Account {
        let mut account = Account::new(id, format!("ACC-{id}"));
        account.outstanding_balance = Some(balance);
        account.days_in_arrears = Some(days);
        account
    }

    fn service() -> CollectionsService<InMemoryAccountRepository> {
        let repository = Arc::new(InMemoryAccountRepository::default());
        let service = CollectionsService::new(repository, RuleSet::standard());
        service
            .load_accounts(
                vec![account("1", 600_000.0, 70.0), account("2", 5_000.0, 10.0)],
                "test",
            )
            .expect("seed loads");
        service
    }

    fn late_graph() -> StrategyGraph {
        StrategyGraph::new(vec![
            StrategyNode::new(
                "check",
                NodeKind::Condition(ConditionData {
                    title: "Late".to_string(),
                    field: ConditionField::DaysPastDue,
                    operator: ConditionOperator::GreaterThan,
                    value: ConditionValue::Text("30".to_string()),
                }),
            )
            .with_connections(vec![Connection::to("call"), Connection::to("end")]),
            StrategyNode::new(
                "call",
                NodeKind::Action(ActionData {
                    title: "Call".to_string(),
                    action_type: "phone".to_string(),
                    priority: ActionPriority::High,
                    template: None,
                    scheduling: None,
                }),
            ),
            StrategyNode::new(
                "end",
                NodeKind::End(EndData {
                    title: "Close".to_string(),
                    outcome: "closed".to_string(),
                    reason: String::new(),
                }),
            ),
        ])
    }

    fn draft() -> StrategyDraft {
        StrategyDraft {
            id: None,
            name: "Late payers".to_string(),
            description: String::new(),
            graph: late_graph(),
            created_by: "supervisor".to_string(),
        }
    }

    #[test]
    fn loading_evaluates_with_rules() {
        let service = service();
        let first = service.account(&AccountId::new("1")).expect("account exists");
        assert_eq!(first.priority, Some(1));
        assert_eq!(first.next_action.as_deref(), Some("Urgent Legal Review"));
        assert_eq!(first.priority_scale, Some(PriorityScale::LowerIsUrgent));
    }

    #[test]
    fn import_merges_and_reevaluates() {
        let service = service();
        let summary = service
            .import(
                &[
                    ImportRecord {
                        account_number: "ACC-2".to_string(),
                        outstanding_balance: Some(600_000.0),
                        days_in_arrears: Some(75.0),
                        ..ImportRecord::default()
                    },
                    ImportRecord {
                        account_number: "ACC-404".to_string(),
                        ..ImportRecord::default()
                    },
                ],
                "importer",
            )
            .expect("import succeeds");

        assert_eq!(summary.received, 2);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.unmatched, vec!["ACC-404".to_string()]);
        let report = summary.reevaluation.expect("queue re-evaluated");
        assert_eq!(report.evaluated, 2);
        assert_eq!(report.changed, 1);
        assert_eq!(report.triggered_by, "importer");

        let second = service.account(&AccountId::new("2")).expect("account exists");
        assert_eq!(second.next_action.as_deref(), Some("Urgent Legal Review"));
    }

    #[test]
    fn import_without_matches_leaves_queue_alone() {
        let service = service();
        let summary = service
            .import(
                &[ImportRecord {
                    account_number: "nope".to_string(),
                    ..ImportRecord::default()
                }],
                "importer",
            )
            .expect("import succeeds");
        assert_eq!(summary.updated, 0);
        assert!(summary.reevaluation.is_none());
    }

    #[test]
    fn activating_a_graph_switches_the_queue() {
        let service = service();
        let saved = service.save_strategy(draft(), "supervisor").expect("saves");

        let (active, report) = service
            .activate_strategy(&saved.id, "supervisor")
            .expect("activates");
        assert_eq!(report.strategy, "graph");
        assert_eq!(report.strategy_id.as_deref(), Some(active.id.as_str()));
        assert_eq!(report.changed, 2);

        let first = service.account(&AccountId::new("1")).expect("account exists");
        assert_eq!(first.next_action.as_deref(), Some("phone - Call"));
        assert_eq!(first.priority, Some(8));
        assert_eq!(first.priority_scale, Some(PriorityScale::HigherIsUrgent));

        let report = service.deactivate_strategy("supervisor").expect("deactivates");
        assert_eq!(report.strategy, "rules");
        let first = service.account(&AccountId::new("1")).expect("account exists");
        assert_eq!(first.priority, Some(1));
    }

    #[test]
    fn revising_the_active_strategy_reevaluates() {
        let service = service();
        let saved = service.save_strategy(draft(), "supervisor").expect("saves");
        service
            .activate_strategy(&saved.id, "supervisor")
            .expect("activates");

        let mut revision = draft();
        revision.id = Some(saved.id.clone());
        revision.graph = StrategyGraph::default();
        let revised = service.save_strategy(revision, "supervisor").expect("saves");
        assert_eq!(revised.version, 2);

        let first = service.account(&AccountId::new("1")).expect("account exists");
        assert_eq!(first.next_action.as_deref(), Some("No strategy defined"));
    }

    #[test]
    fn unknown_strategy_and_account_are_errors() {
        let service = service();
        assert!(matches!(
            service.activate_strategy("missing", "supervisor"),
            Err(CollectionsServiceError::Library(StrategyLibraryError::NotFound(_)))
        ));
        assert!(matches!(
            service.account(&AccountId::new("missing")),
            Err(CollectionsServiceError::Repository(RepositoryError::NotFound))
        ));
    }

    #[test]
    fn testing_a_graph_leaves_the_queue_untouched() {
        let service = service();
        let before = service.accounts().expect("accounts");

        let result = service.test_strategy(&late_graph(), &account("probe", 1.0, 45.0));
        assert_eq!(result.evaluation.next_action, "phone - Call");
        assert!(result.issues.is_empty());
        assert_eq!(service.accounts().expect("accounts"), before);
    }
}
