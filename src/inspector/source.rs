use async_trait::async_trait;
use serde::Deserialize;
use crate::credential::Credential;
use crate::error::UpstreamError;

/// Account as returned by the auth admin listing. Unknown fields are dropped.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DirectoryUser {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub factors: Option<Vec<AuthFactor>>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AuthFactor {
    #[serde(default)]
    pub id: String,
    pub factor_type: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PublicTable {
    pub tablename: String,
}

/// One row of `pg_policies`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PolicyRow {
    #[serde(default)]
    pub schemaname: Option<String>,
    pub tablename: String,
    #[serde(default)]
    pub policyname: Option<String>,
    #[serde(default)]
    pub cmd: Option<String>,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn list_users(&self, credential: &Credential) -> Result<Vec<DirectoryUser>, UpstreamError>;
}

#[async_trait]
pub trait SecurityCatalog: Send + Sync {
    async fn list_public_tables(&self) -> Result<Vec<PublicTable>, UpstreamError>;

    /// `Ok(None)` when the catalog answered but could not say.
    async fn rls_enabled(&self, table: &str) -> Result<Option<bool>, UpstreamError>;

    async fn list_policies(&self, table: &str) -> Result<Vec<PolicyRow>, UpstreamError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_user_tolerates_missing_fields() {
        let json = r#"[
            {"id": "1", "email": "a@example.com", "factors": [{"id": "f", "factor_type": "totp", "status": "verified"}], "role": "authenticated"},
            {"id": "2", "email": "b@example.com"},
            {"id": "3", "factors": null}
        ]"#;
        let users: Vec<DirectoryUser> = serde_json::from_str(json).unwrap();
        assert_eq!(users.len(), 3);
        assert_eq!(users[0].factors.as_ref().unwrap()[0].factor_type, "totp");
        assert!(users[1].factors.is_none());
        assert!(users[2].email.is_none());
    }

    #[test]
    fn test_policy_row_from_pg_policies() {
        let json = r#"{"schemaname":"public","tablename":"orders","policyname":"owner can read","permissive":"PERMISSIVE","roles":["authenticated"],"cmd":"SELECT","qual":"(auth.uid() = user_id)","with_check":null}"#;
        let row: PolicyRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.tablename, "orders");
        assert_eq!(row.cmd.as_deref(), Some("SELECT"));
    }
}
