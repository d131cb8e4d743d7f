#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use supaudit::{
    AuthFactor, ComplianceLogEntry, ComplianceLogStore, ComplianceScanner, Credential, DirectoryUser,
    PlanTier, PolicyRow, PublicTable, SecurityCatalog, UpstreamError, UserDirectory,
};

pub fn user(email: &str, factor_types: &[&str]) -> DirectoryUser {
    DirectoryUser {
        id: format!("id-{email}"),
        email: Some(email.to_string()),
        factors: Some(
            factor_types
                .iter()
                .enumerate()
                .map(|(i, kind)| AuthFactor {
                    id: format!("factor-{i}"),
                    factor_type: kind.to_string(),
                    status: Some("verified".to_string()),
                })
                .collect(),
        ),
    }
}

pub fn connection_reset() -> UpstreamError {
    UpstreamError::ConnectionFailed { reason: "connection reset by peer".to_string() }
}

pub struct MockDirectory {
    users: Result<Vec<DirectoryUser>, UpstreamError>,
    calls: AtomicUsize,
    keys: Mutex<Vec<String>>,
}

impl MockDirectory {
    pub fn with_users(users: Vec<DirectoryUser>) -> Self {
        Self {
            users: Ok(users),
            calls: AtomicUsize::new(0),
            keys: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: UpstreamError) -> Self {
        Self {
            users: Err(err),
            calls: AtomicUsize::new(0),
            keys: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn keys_seen(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl UserDirectory for MockDirectory {
    async fn list_users(&self, credential: &Credential) -> Result<Vec<DirectoryUser>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.keys.lock().unwrap().push(credential.expose().to_string());
        self.users.clone()
    }
}

#[derive(Default)]
pub struct MockCatalog {
    tables: Vec<String>,
    rls: HashMap<String, Result<Option<bool>, UpstreamError>>,
    policies: HashMap<String, usize>,
    enumeration_error: Option<UpstreamError>,
    calls: AtomicUsize,
}

impl MockCatalog {
    pub fn with_tables(names: &[&str]) -> Self {
        Self {
            tables: names.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn failing(err: UpstreamError) -> Self {
        Self {
            enumeration_error: Some(err),
            ..Default::default()
        }
    }

    pub fn rls(mut self, table: &str, result: Result<Option<bool>, UpstreamError>) -> Self {
        self.rls.insert(table.to_string(), result);
        self
    }

    pub fn policies(mut self, table: &str, count: usize) -> Self {
        self.policies.insert(table.to_string(), count);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecurityCatalog for MockCatalog {
    async fn list_public_tables(&self) -> Result<Vec<PublicTable>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.enumeration_error {
            return Err(err.clone());
        }
        Ok(self
            .tables
            .iter()
            .map(|t| PublicTable { tablename: t.clone() })
            .collect())
    }

    async fn rls_enabled(&self, table: &str) -> Result<Option<bool>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rls.get(table).cloned().unwrap_or(Ok(Some(false)))
    }

    async fn list_policies(&self, table: &str) -> Result<Vec<PolicyRow>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let count = self.policies.get(table).copied().unwrap_or(0);
        Ok((0..count)
            .map(|i| PolicyRow {
                schemaname: Some("public".to_string()),
                tablename: table.to_string(),
                policyname: Some(format!("{table}_policy_{i}")),
                cmd: Some("ALL".to_string()),
            })
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryLogStore {
    rows: Mutex<Vec<ComplianceLogEntry>>,
    reject_with: Option<UpstreamError>,
    inserts: AtomicUsize,
}

impl MemoryLogStore {
    pub fn rejecting(err: UpstreamError) -> Self {
        Self {
            reject_with: Some(err),
            ..Default::default()
        }
    }

    pub fn rows(&self) -> Vec<ComplianceLogEntry> {
        self.rows.lock().unwrap().clone()
    }

    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn seed(&self, entry: ComplianceLogEntry) {
        self.rows.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl ComplianceLogStore for MemoryLogStore {
    async fn insert_log(&self, entry: &ComplianceLogEntry) -> Result<(), UpstreamError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.reject_with {
            return Err(err.clone());
        }
        self.rows.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn fetch_logs(&self, limit: Option<usize>) -> Result<Vec<ComplianceLogEntry>, UpstreamError> {
        let rows = self.rows.lock().unwrap().clone();
        Ok(rows.into_iter().take(limit.unwrap_or(usize::MAX)).collect())
    }
}

/// Two tables: `orders` protected with two policies, `users` whose RLS lookup fails.
/// One account with a TOTP factor.
pub fn scenario_a() -> (Arc<MockDirectory>, Arc<MockCatalog>) {
    let directory = Arc::new(MockDirectory::with_users(vec![user("alice@example.com", &["totp"])]));
    let catalog = Arc::new(
        MockCatalog::with_tables(&["orders", "users"])
            .rls("orders", Ok(Some(true)))
            .policies("orders", 2)
            .rls("users", Err(connection_reset()))
            .policies("users", 1),
    );
    (directory, catalog)
}

pub fn scanner(directory: Arc<MockDirectory>, catalog: Arc<MockCatalog>, plan: PlanTier) -> ComplianceScanner {
    ComplianceScanner::new(directory, catalog, plan)
}
