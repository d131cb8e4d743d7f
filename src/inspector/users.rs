use tracing::{debug, error};
use crate::credential::Credential;
use crate::error::{AuditError, Result};
use crate::report::UserMfaRecord;
use super::source::{DirectoryUser, UserDirectory};

const TOTP_FACTOR: &str = "totp";

pub async fn list_user_mfa_status(
    directory: &dyn UserDirectory,
    credential: &Credential,
) -> Result<Vec<UserMfaRecord>> {
    let users = directory.list_users(credential).await.map_err(|e| {
        error!(code = e.error_code(), "Error fetching users: {}", e);
        AuditError::DirectoryUnavailable(e)
    })?;

    debug!(accounts = users.len(), "Fetched user directory");

    Ok(users.iter().map(mfa_record).collect())
}

/// Only TOTP counts. Phone or WebAuthn factors leave the account reported as MFA-disabled.
pub fn has_totp_factor(user: &DirectoryUser) -> bool {
    user.factors
        .as_deref()
        .unwrap_or_default()
        .iter()
        .any(|f| f.factor_type == TOTP_FACTOR)
}

fn mfa_record(user: &DirectoryUser) -> UserMfaRecord {
    UserMfaRecord {
        email: user.email.clone().unwrap_or_default(),
        mfa_enabled: has_totp_factor(user),
    }
}
