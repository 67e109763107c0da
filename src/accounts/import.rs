use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::domain::Account;

/// Partial update for one account, keyed by account number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    #[serde(alias = "accountNumber")]
    pub account_number: String,
    #[serde(default, alias = "outstandingBalance", alias = "currentBalance")]
    pub outstanding_balance: Option<f64>,
    #[serde(default, alias = "lastPaymentAmount")]
    pub last_payment_amount: Option<f64>,
    #[serde(default, alias = "lastPaymentDate")]
    pub last_payment_date: Option<NaiveDate>,
    #[serde(default, alias = "totalDaysInArrears", alias = "daysPastDue")]
    pub days_in_arrears: Option<f64>,
}

impl ImportRecord {
    fn apply_to(&self, account: &mut Account) {
        if let Some(balance) = self.outstanding_balance {
            account.outstanding_balance = Some(balance);
        }
        if let Some(amount) = self.last_payment_amount {
            account.last_payment_amount = Some(amount);
        }
        if let Some(date) = self.last_payment_date {
            account.last_payment_date = Some(date);
        }
        if let Some(days) = self.days_in_arrears {
            account.days_in_arrears = Some(days);
        }
    }
}

/// Result of merging a batch of import records into a collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    pub accounts: Vec<Account>,
    pub updated: usize,
    pub unmatched: Vec<String>,
}

/// Applies `records` to copies of `accounts`. Rows whose account number is
/// unknown are reported in `unmatched`; later rows for the same account win.
pub fn merge_records(accounts: &[Account], records: &[ImportRecord]) -> MergeOutcome {
    let mut merged = accounts.to_vec();
    let mut touched = vec![false; merged.len()];
    let mut unmatched = Vec::new();

    for record in records {
        let number = record.account_number.trim();
        match merged
            .iter()
            .position(|account| account.account_number == number)
        {
            Some(index) => {
                record.apply_to(&mut merged[index]);
                touched[index] = true;
            }
            None => unmatched.push(number.to_string()),
        }
    }

    MergeOutcome {
        updated: touched.iter().filter(|flag| **flag).count(),
        accounts: merged,
        unmatched,
    }
}

/// Error raised while reading account or import files.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read import file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse CSV import: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to parse JSON import: {0}")]
    Json(#[from] serde_json::Error),
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Reads account records from CSV. Rows without an `id` use their account
/// number as identity.
pub fn read_accounts<R: Read>(reader: R) -> Result<Vec<Account>, ImportError> {
    let mut accounts = Vec::new();
    for row in csv_reader(reader).deserialize::<Account>() {
        accounts.push(with_identity(row?));
    }
    Ok(accounts)
}

pub fn read_import_records<R: Read>(reader: R) -> Result<Vec<ImportRecord>, ImportError> {
    let mut records = Vec::new();
    for row in csv_reader(reader).deserialize::<ImportRecord>() {
        records.push(row?);
    }
    Ok(records)
}

/// Loads accounts from a `.json` array or, for any other extension, CSV.
pub fn load_accounts_from_path(path: impl AsRef<Path>) -> Result<Vec<Account>, ImportError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        let accounts: Vec<Account> = serde_json::from_reader(file)?;
        Ok(accounts.into_iter().map(with_identity).collect())
    } else {
        read_accounts(file)
    }
}

fn with_identity(mut account: Account) -> Account {
    if account.id.as_str().is_empty() {
        account.id = super::domain::AccountId::new(account.account_number.clone());
    }
    account
}
