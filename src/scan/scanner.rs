use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;
use crate::credential::Credential;
use crate::error::{AuditError, Result};
use crate::inspector::{list_user_mfa_status, SecurityCatalog, TableSecurityInspector, UserDirectory};
use crate::policy::PlanTier;
use crate::report::Report;
use super::retry::RetryPolicy;

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub max_concurrency: Option<usize>,
    pub timeout: Option<Duration>,
    pub retry: RetryPolicy,
}

/// Runs the user and table inspectors side by side and folds in the plan's PITR status.
pub struct ComplianceScanner {
    directory: Arc<dyn UserDirectory>,
    tables: TableSecurityInspector,
    plan: PlanTier,
    options: ScanOptions,
}

impl ComplianceScanner {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        catalog: Arc<dyn SecurityCatalog>,
        plan: PlanTier,
    ) -> Self {
        Self {
            directory,
            tables: TableSecurityInspector::new(catalog),
            plan,
            options: ScanOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.tables = self.tables.with_max_concurrency(options.max_concurrency);
        self.options = options;
        self
    }

    pub fn plan(&self) -> PlanTier {
        self.plan
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Produces one report or fails as a whole. The credential is checked before
    /// anything leaves the process.
    pub async fn run_scan(&self, credential: Option<&str>) -> Result<Report> {
        let credential = Credential::parse(credential)?;

        let span = info_span!("scan", scan_id = %Uuid::new_v4());
        let scan = self.collect(&credential).instrument(span);

        match self.options.timeout {
            Some(limit) => tokio::time::timeout(limit, scan).await.map_err(|_| {
                let millis = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                warn!(timeout_ms = millis, "Compliance scan timed out, in-flight lookups aborted");
                AuditError::Timeout { millis }
            })?,
            None => scan.await,
        }
    }

    async fn collect(&self, credential: &Credential) -> Result<Report> {
        let started = Instant::now();
        info!(plan = %self.plan, "Starting compliance scan");

        let directory = self.directory.as_ref();
        let tables = &self.tables;
        let retry = &self.options.retry;

        let (user_mfa_status, table_rls_status) = tokio::try_join!(
            retry.run("list_users", move || list_user_mfa_status(directory, credential)),
            retry.run("list_tables", move || tables.list_table_security()),
        )?;

        let report = Report {
            user_mfa_status,
            table_rls_status,
            pitr_status: self.plan.pitr(),
        };

        info!(
            accounts = report.user_mfa_status.len(),
            mfa_enabled = report.mfa_enabled_count(),
            tables = report.table_rls_status.len(),
            pitr = report.pitr_status.enabled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Compliance scan complete"
        );
        Ok(report)
    }
}
