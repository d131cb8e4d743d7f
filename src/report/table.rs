use tabled::Tabled;
use crate::audit_log::ComplianceLogEntry;
use crate::policy::RetentionDays;
use super::types::{TableSecurityRecord, UserMfaRecord};

#[derive(Debug, Clone, Tabled)]
pub struct UserMfaRow {
    #[tabled(rename = "Email")]
    pub email: String,
    #[tabled(rename = "MFA")]
    pub mfa: String,
}

impl From<&UserMfaRecord> for UserMfaRow {
    fn from(record: &UserMfaRecord) -> Self {
        let email = if record.email.is_empty() {
            "<no email>".to_string()
        } else {
            record.email.clone()
        };

        UserMfaRow {
            email,
            mfa: status_cell(record.mfa_enabled, "enabled", "disabled"),
        }
    }
}

#[derive(Debug, Clone, Tabled)]
pub struct TableSecurityRow {
    #[tabled(rename = "Table")]
    pub table: String,
    #[tabled(rename = "RLS")]
    pub rls: String,
    #[tabled(rename = "Policies")]
    pub policies: String,
}

impl From<&TableSecurityRecord> for TableSecurityRow {
    fn from(record: &TableSecurityRecord) -> Self {
        TableSecurityRow {
            table: record.table.clone(),
            rls: status_cell(record.rls_enabled, "enabled", "disabled"),
            policies: status_cell(record.policies_exist, "present", "none"),
        }
    }
}

#[derive(Debug, Clone, Tabled)]
pub struct LogEntryRow {
    #[tabled(rename = "Created")]
    pub created_at: String,
    #[tabled(rename = "Operator")]
    pub operator: String,
    #[tabled(rename = "MFA")]
    pub mfa: String,
    #[tabled(rename = "RLS")]
    pub rls: String,
    #[tabled(rename = "PITR")]
    pub pitr: String,
}

impl From<&ComplianceLogEntry> for LogEntryRow {
    fn from(entry: &ComplianceLogEntry) -> Self {
        let mfa_on = entry.mfa_status.iter().filter(|u| u.mfa_enabled).count();
        let protected = entry.rls_status.iter().filter(|t| t.is_protected()).count();

        let pitr = match (entry.pitr_status.enabled, entry.pitr_status.max_retention_days) {
            (true, RetentionDays::Days(d)) => format!("✓ {} days", d),
            (true, RetentionDays::Varies) => "✓ varies".to_string(),
            (false, _) => "✗ off".to_string(),
        };

        LogEntryRow {
            created_at: entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            operator: entry.user_email.clone(),
            mfa: format!("{}/{}", mfa_on, entry.mfa_status.len()),
            rls: format!("{}/{}", protected, entry.rls_status.len()),
            pitr,
        }
    }
}

fn status_cell(ok: bool, yes: &str, no: &str) -> String {
    if ok {
        format!("✓ {}", yes)
    } else {
        format!("✗ {}", no)
    }
}
