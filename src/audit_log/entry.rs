use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::policy::PitrStatus;
use crate::report::{Report, TableSecurityRecord, UserMfaRecord};

/// One row of the compliance log table. Nested records keep the report's camelCase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceLogEntry {
    pub user_email: String,
    pub mfa_status: Vec<UserMfaRecord>,
    pub rls_status: Vec<TableSecurityRecord>,
    pub pitr_status: PitrStatus,
    pub created_at: DateTime<Utc>,
}

impl ComplianceLogEntry {
    pub fn from_report(user_email: impl Into<String>, report: &Report, created_at: DateTime<Utc>) -> Self {
        Self {
            user_email: user_email.into(),
            mfa_status: report.user_mfa_status.clone(),
            rls_status: report.table_rls_status.clone(),
            pitr_status: report.pitr_status.clone(),
            created_at,
        }
    }
}

/// Inbound body for a log append. Nothing is checked beyond the shape; absent
/// record fields read as their zero value and `created_at` is stamped on receipt.
#[derive(Debug, Clone, Deserialize)]
pub struct LogEntryRequest {
    pub user_email: String,
    #[serde(default)]
    pub mfa_status: Vec<UserMfaRecord>,
    #[serde(default)]
    pub rls_status: Vec<TableSecurityRecord>,
    pub pitr_status: PitrStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl LogEntryRequest {
    pub fn into_entry(self, now: DateTime<Utc>) -> ComplianceLogEntry {
        ComplianceLogEntry {
            user_email: self.user_email,
            mfa_status: self.mfa_status,
            rls_status: self.rls_status,
            pitr_status: self.pitr_status,
            created_at: self.created_at.unwrap_or(now),
        }
    }
}
