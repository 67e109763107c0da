use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::strategy::{AccountEvaluation, DelinquencyState, PriorityScale};

/// Stable identifier for an account under collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Debtor record under collection.
///
/// Numeric inputs are optional so that a blank import cell or an absent JSON
/// key stays distinguishable from zero. Both the queue (`currentBalance`,
/// `daysPastDue`) and case (`outstandingBalance`, `totalDaysInArrears`)
/// spellings are accepted on input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Account {
    pub id: AccountId,
    #[serde(alias = "accountNumber")]
    pub account_number: String,
    #[serde(alias = "customerId", skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(alias = "customerName")]
    pub customer_name: String,
    #[serde(alias = "outstandingBalance", alias = "currentBalance")]
    pub outstanding_balance: Option<f64>,
    #[serde(alias = "originalAmount", alias = "originalDebtAmount")]
    pub original_amount: Option<f64>,
    #[serde(alias = "lastPaymentAmount")]
    pub last_payment_amount: Option<f64>,
    #[serde(alias = "lastPaymentDate")]
    pub last_payment_date: Option<NaiveDate>,
    #[serde(alias = "totalDaysInArrears", alias = "daysPastDue")]
    pub days_in_arrears: Option<f64>,
    #[serde(alias = "durationInCollections")]
    pub duration_in_collections: Option<u32>,
    #[serde(alias = "delinquencyBand", skip_serializing_if = "Option::is_none")]
    pub delinquency_band: Option<String>,
    #[serde(alias = "debtCategory", skip_serializing_if = "Option::is_none")]
    pub debt_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub priority: Option<i32>,
    #[serde(alias = "nextAction")]
    pub next_action: Option<String>,
    #[serde(alias = "delinquencyState")]
    pub delinquency_state: Option<DelinquencyState>,
    #[serde(alias = "priorityScale")]
    pub priority_scale: Option<PriorityScale>,
}

impl Account {
    pub fn new(id: impl Into<String>, account_number: impl Into<String>) -> Self {
        Self {
            id: AccountId::new(id),
            account_number: account_number.into(),
            ..Self::default()
        }
    }

    /// Returns a copy carrying the evaluation's derived fields; every input
    /// field is left as it was.
    pub fn with_evaluation(&self, evaluation: &AccountEvaluation) -> Self {
        Self {
            priority: Some(evaluation.priority),
            next_action: Some(evaluation.next_action.clone()),
            delinquency_state: Some(evaluation.delinquency_state),
            priority_scale: Some(evaluation.priority_scale),
            ..self.clone()
        }
    }

    /// Current derived fields, if the account has been evaluated.
    pub fn evaluation(&self) -> Option<AccountEvaluation> {
        Some(AccountEvaluation {
            priority: self.priority?,
            next_action: self.next_action.clone()?,
            delinquency_state: self.delinquency_state?,
            priority_scale: self.priority_scale?,
        })
    }
}
