//! Collection queue: account records, the in-memory store, imports, and the
//! service that keeps derived fields in step with the active strategy.

pub mod domain;
pub mod import;
pub mod reevaluate;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{Account, AccountId};
pub use import::{
    load_accounts_from_path, merge_records, read_accounts, read_import_records, ImportError,
    ImportRecord, MergeOutcome,
};
pub use reevaluate::{reapply_all, reapply_with_summary, ReevaluationSummary};
pub use repository::{AccountRepository, InMemoryAccountRepository, RepositoryError};
pub use router::{collections_router, TRIGGERED_BY_HEADER};
pub use service::{
    CollectionsService, CollectionsServiceError, ImportSummary, ReevaluationReport,
    StrategyTestResult,
};
