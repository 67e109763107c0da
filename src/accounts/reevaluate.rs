use serde::Serialize;

use super::domain::Account;
use crate::strategy::AccountEvaluator;

/// Counts from one batch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReevaluationSummary {
    pub evaluated: usize,
    pub changed: usize,
}

/// Maps every account through `evaluator`, returning fresh copies with only
/// the derived fields replaced. The input slice is never modified.
pub fn reapply_all<E>(accounts: &[Account], evaluator: &E) -> Vec<Account>
where
    E: AccountEvaluator + ?Sized,
{
    reapply_with_summary(accounts, evaluator).0
}

/// Same as [`reapply_all`], also reporting how many accounts moved.
pub fn reapply_with_summary<E>(
    accounts: &[Account],
    evaluator: &E,
) -> (Vec<Account>, ReevaluationSummary)
where
    E: AccountEvaluator + ?Sized,
{
    let mut summary = ReevaluationSummary::default();

    let evaluated = accounts
        .iter()
        .map(|account| {
            let evaluation = evaluator.evaluate_account(account);
            summary.evaluated += 1;
            if account.evaluation().as_ref() != Some(&evaluation) {
                summary.changed += 1;
            }
            account.with_evaluation(&evaluation)
        })
        .collect();

    (evaluated, summary)
}
