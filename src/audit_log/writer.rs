use std::sync::Arc;
use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};
use crate::error::{AuditError, Result, UpstreamError};
use crate::report::Report;
use super::entry::ComplianceLogEntry;

pub const DEFAULT_LOG_TABLE: &str = "compliance_logs";

#[async_trait]
pub trait ComplianceLogStore: Send + Sync {
    async fn insert_log(&self, entry: &ComplianceLogEntry) -> std::result::Result<(), UpstreamError>;

    /// Newest first.
    async fn fetch_logs(&self, limit: Option<usize>) -> std::result::Result<Vec<ComplianceLogEntry>, UpstreamError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogStatus {
    Recorded,
    Skipped,
    Failed(String),
}

/// A finished scan plus what happened when filing it. A failed write leaves the report intact.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub report: Report,
    pub log: LogStatus,
}

impl ScanOutcome {
    pub fn unlogged(report: Report) -> Self {
        Self {
            report,
            log: LogStatus::Skipped,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.log, LogStatus::Failed(_))
    }
}

#[derive(Clone)]
pub struct AuditLogWriter {
    store: Arc<dyn ComplianceLogStore>,
}

impl AuditLogWriter {
    pub fn new(store: Arc<dyn ComplianceLogStore>) -> Self {
        Self { store }
    }

    pub async fn append_log(&self, entry: &ComplianceLogEntry) -> Result<()> {
        self.store.insert_log(entry).await.map_err(|e| {
            warn!(code = e.error_code(), "Failed to log compliance results: {}", e);
            AuditError::LogWrite(e.detail())
        })?;

        info!(
            operator = %entry.user_email,
            accounts = entry.mfa_status.len(),
            tables = entry.rls_status.len(),
            "Recorded compliance snapshot"
        );
        Ok(())
    }

    pub async fn list_logs(&self, limit: Option<usize>) -> Result<Vec<ComplianceLogEntry>> {
        let mut entries = self.store.fetch_logs(limit).await.map_err(AuditError::LogRead)?;
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }
}

/// Stamps the report with the current time and appends it.
pub async fn file_report(writer: &AuditLogWriter, operator_email: &str, report: Report) -> ScanOutcome {
    let entry = ComplianceLogEntry::from_report(operator_email, &report, Utc::now());
    let log = match writer.append_log(&entry).await {
        Ok(()) => LogStatus::Recorded,
        Err(e) => LogStatus::Failed(e.to_string()),
    };
    ScanOutcome { report, log }
}
