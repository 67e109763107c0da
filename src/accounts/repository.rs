use std::sync::{Arc, Mutex};

use super::domain::{Account, AccountId};

/// Storage abstraction for the collection queue.
///
/// `replace_all` swaps the whole collection in one assignment so readers
/// never see a partially re-evaluated queue.
pub trait AccountRepository: Send + Sync {
    fn all(&self) -> Result<Vec<Account>, RepositoryError>;
    fn fetch(&self, id: &AccountId) -> Result<Option<Account>, RepositoryError>;
    fn replace_all(&self, accounts: Vec<Account>) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryAccountRepository {
    accounts: Arc<Mutex<Arc<Vec<Account>>>>,
}

impl InMemoryAccountRepository {
    pub fn with_accounts(accounts: Vec<Account>) -> Self {
        Self {
            accounts: Arc::new(Mutex::new(Arc::new(accounts))),
        }
    }

    /// Shared handle to the current collection without copying it.
    pub fn snapshot(&self) -> Result<Arc<Vec<Account>>, RepositoryError> {
        let guard = self
            .accounts
            .lock()
            .map_err(|_| RepositoryError::Unavailable("account store lock poisoned".to_string()))?;
        Ok(Arc::clone(&guard))
    }
}

impl AccountRepository for InMemoryAccountRepository {
    fn all(&self) -> Result<Vec<Account>, RepositoryError> {
        Ok(self.snapshot()?.as_ref().clone())
    }

    fn fetch(&self, id: &AccountId) -> Result<Option<Account>, RepositoryError> {
        Ok(self
            .snapshot()?
            .iter()
            .find(|account| &account.id == id)
            .cloned())
    }

    fn replace_all(&self, accounts: Vec<Account>) -> Result<(), RepositoryError> {
        let mut guard = self
            .accounts
            .lock()
            .map_err(|_| RepositoryError::Unavailable("account store lock poisoned".to_string()))?;
        *guard = Arc::new(accounts);
        Ok(())
    }
}
