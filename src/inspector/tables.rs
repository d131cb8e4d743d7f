use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn, Instrument};
use crate::error::{AuditError, Result, UpstreamError};
use crate::report::TableSecurityRecord;
use super::source::{PolicyRow, SecurityCatalog};

pub struct TableSecurityInspector {
    catalog: Arc<dyn SecurityCatalog>,
    max_concurrency: Option<usize>,
}

impl TableSecurityInspector {
    pub fn new(catalog: Arc<dyn SecurityCatalog>) -> Self {
        Self {
            catalog,
            max_concurrency: None,
        }
    }

    /// Caps in-flight tables. `None` or `Some(0)` leaves the fan-out unbounded.
    pub fn with_max_concurrency(mut self, max: Option<usize>) -> Self {
        self.max_concurrency = max.filter(|m| *m > 0);
        self
    }

    pub fn max_concurrency(&self) -> Option<usize> {
        self.max_concurrency
    }

    /// One record per enumerated table, in enumeration order.
    pub async fn list_table_security(&self) -> Result<Vec<TableSecurityRecord>> {
        let tables = self.catalog.list_public_tables().await.map_err(|e| {
            error!(code = e.error_code(), "Error fetching tables: {}", e);
            AuditError::CatalogUnavailable(e)
        })?;

        info!(
            tables = tables.len(),
            max_concurrency = ?self.max_concurrency,
            "Inspecting public tables"
        );

        let semaphore = self.max_concurrency.map(|n| Arc::new(Semaphore::new(n)));
        let mut set = JoinSet::new();

        for (idx, table) in tables.iter().enumerate() {
            let catalog = Arc::clone(&self.catalog);
            let sem = semaphore.clone();
            let name = table.tablename.clone();

            set.spawn(async move {
                let _permit = match &sem {
                    Some(s) => match s.acquire().await {
                        Ok(p) => Some(p),
                        Err(_) => return (idx, fail_closed_record(name)),
                    },
                    None => None,
                };
                (idx, inspect_table(catalog.as_ref(), name).await)
            }
            .in_current_span());
        }

        let mut slots: Vec<Option<TableSecurityRecord>> = vec![None; tables.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, record)) => slots[idx] = Some(record),
                Err(e) => warn!(error = %e, "Table inspection task did not complete"),
            }
        }

        Ok(slots
            .into_iter()
            .zip(tables)
            .map(|(slot, table)| slot.unwrap_or_else(|| fail_closed_record(table.tablename)))
            .collect())
    }
}

async fn inspect_table(catalog: &dyn SecurityCatalog, table: String) -> TableSecurityRecord {
    let (rls, policies) = tokio::join!(
        catalog.rls_enabled(&table),
        catalog.list_policies(&table),
    );
    table_record(table, rls, policies)
}

/// Combines the two per-table lookups. Any doubt about RLS yields the
/// fail-closed record; a failed policy lookup counts as no policies.
pub fn table_record(
    table: String,
    rls: std::result::Result<Option<bool>, UpstreamError>,
    policies: std::result::Result<Vec<PolicyRow>, UpstreamError>,
) -> TableSecurityRecord {
    let rls_enabled = match rls {
        Ok(Some(enabled)) => enabled,
        Ok(None) => {
            warn!(table = %table, "RLS status indeterminate, recording as disabled");
            return fail_closed_record(table);
        }
        Err(e) => {
            warn!(table = %table, code = e.error_code(), "RLS lookup failed, recording as disabled: {}", e);
            return fail_closed_record(table);
        }
    };

    let policies_exist = match policies {
        Ok(rows) => {
            debug!(table = %table, policies = rows.len(), rls_enabled, "Inspected table");
            !rows.is_empty()
        }
        Err(e) => {
            warn!(table = %table, code = e.error_code(), "Policy lookup failed, counting zero policies: {}", e);
            false
        }
    };

    TableSecurityRecord {
        table,
        rls_enabled,
        policies_exist,
    }
}

pub fn fail_closed_record(table: impl Into<String>) -> TableSecurityRecord {
    TableSecurityRecord {
        table: table.into(),
        rls_enabled: false,
        policies_exist: false,
    }
}
