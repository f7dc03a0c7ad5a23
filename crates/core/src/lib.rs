pub mod approvals;
pub mod audit;
pub mod config;
pub mod directory;
pub mod domain;
pub mod errors;
pub mod filter;
pub mod fixtures;
pub mod registry;
pub mod rules;
pub mod service;

pub use approvals::{ApprovalEvaluator, ChainBuilder, ChainPolicy, Tally, VoteOutcome};
pub use audit::{AuditEvent, AuditSink, InMemoryAuditSink};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use directory::OrgDirectory;
pub use domain::employee::{Employee, EmployeeId, Role};
pub use domain::expense::{
    ApprovalPolicy, Decision, Expense, ExpenseCategory, ExpenseDraft, ExpenseId, ExpenseStatus,
    PolicySource,
};
pub use domain::rule::ApprovalRule;
pub use errors::{ApplicationError, ApprovalError, DomainError, InterfaceError};
pub use filter::{ExpenseFilter, ExpenseOverview};
pub use fixtures::{Dataset, FixtureError, SeedReport};
pub use registry::ExpenseRegistry;
pub use rules::{RuleStore, RuleUpsert};
pub use service::ApprovalService;
