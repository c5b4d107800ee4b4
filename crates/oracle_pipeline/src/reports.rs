//! Registered baseline reports.
//!
//! Reports are immutable once registered and shared with runs behind an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use oracle_core::types::{FinancialReport, ReportId};
use oracle_core::validation::{validate_report, ValidationIssue};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// Outcome of registering a report.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    /// Assigned id.
    pub id: ReportId,
    /// Warnings and errors found in the statements; registration still succeeds.
    pub issues: Vec<ValidationIssue>,
}

/// In-memory report repository.
#[derive(Debug, Clone, Default)]
pub struct ReportRepository {
    reports: Arc<RwLock<HashMap<ReportId, Arc<FinancialReport>>>>,
}

impl ReportRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `report` under a fresh id and return its validation issues.
    pub async fn insert(&self, report: FinancialReport) -> Registration {
        let issues = validate_report(&report);
        let id = Uuid::new_v4();
        for issue in &issues {
            warn!(report_id = %id, severity = ?issue.severity, "{}", issue.message);
        }
        self.reports.write().await.insert(id, Arc::new(report));
        info!(report_id = %id, issues = issues.len(), "report registered");
        Registration { id, issues }
    }

    /// Fetch a report.
    pub async fn get(&self, id: ReportId) -> Option<Arc<FinancialReport>> {
        self.reports.read().await.get(&id).cloned()
    }

    /// Whether a report is registered under `id`.
    pub async fn contains(&self, id: ReportId) -> bool {
        self.reports.read().await.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracle_core::validation::Severity;

    #[tokio::test]
    async fn test_insert_then_get() {
        let repo = ReportRepository::new();
        let registration = repo.insert(FinancialReport::sample()).await;
        assert!(registration.issues.is_empty());
        assert!(repo.contains(registration.id).await);
        assert_eq!(*repo.get(registration.id).await.unwrap(), FinancialReport::sample());
        assert!(repo.get(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_issues_are_reported_not_fatal() {
        let mut report = FinancialReport::sample();
        report.balance_sheet.equity.clear();
        let repo = ReportRepository::new();
        let registration = repo.insert(report).await;
        assert!(registration
            .issues
            .iter()
            .any(|i| i.severity == Severity::Error && i.message.contains("doesn't balance")));
        assert!(repo.contains(registration.id).await);
    }
}
