use serde::{Deserialize, Serialize};
use crate::policy::PitrStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMfaRecord {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub mfa_enabled: bool,
}

/// `policies_exist` is only trusted when the RLS lookup succeeded; see
/// [`crate::inspector::table_record`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSecurityRecord {
    #[serde(default)]
    pub table: String,
    #[serde(default)]
    pub rls_enabled: bool,
    #[serde(default)]
    pub policies_exist: bool,
}

impl TableSecurityRecord {
    pub fn is_protected(&self) -> bool {
        self.rls_enabled && self.policies_exist
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub user_mfa_status: Vec<UserMfaRecord>,
    pub table_rls_status: Vec<TableSecurityRecord>,
    pub pitr_status: PitrStatus,
}

impl Report {
    pub fn mfa_enabled_count(&self) -> usize {
        self.user_mfa_status.iter().filter(|u| u.mfa_enabled).count()
    }

    pub fn users_without_mfa(&self) -> Vec<&UserMfaRecord> {
        self.user_mfa_status.iter().filter(|u| !u.mfa_enabled).collect()
    }

    pub fn tables_without_rls(&self) -> Vec<&TableSecurityRecord> {
        self.table_rls_status.iter().filter(|t| !t.rls_enabled).collect()
    }

    /// RLS is on but nothing is attached, so every row is hidden from non-bypass roles.
    pub fn tables_without_policies(&self) -> Vec<&TableSecurityRecord> {
        self.table_rls_status
            .iter()
            .filter(|t| t.rls_enabled && !t.policies_exist)
            .collect()
    }

    pub fn is_compliant(&self) -> bool {
        self.user_mfa_status.iter().all(|u| u.mfa_enabled)
            && self.table_rls_status.iter().all(TableSecurityRecord::is_protected)
            && self.pitr_status.enabled
    }
}
