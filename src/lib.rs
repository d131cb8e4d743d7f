pub mod error;
pub mod policy;
pub mod credential;
pub mod report;
pub mod inspector;
pub mod scan;
pub mod audit_log;
pub mod config;
pub mod client;
pub mod server;

pub use error::{AuditError, UpstreamError, Result};
pub use policy::{PlanTier, PitrStatus, RetentionDays, resolve_pitr};
pub use credential::Credential;
pub use report::{Report, UserMfaRecord, TableSecurityRecord, UserMfaRow, TableSecurityRow, LogEntryRow};
pub use inspector::{
    UserDirectory, SecurityCatalog, DirectoryUser, AuthFactor, PublicTable, PolicyRow,
    list_user_mfa_status, has_totp_factor, TableSecurityInspector, fail_closed_record,
};
pub use scan::{ComplianceScanner, ScanOptions, RetryPolicy};
pub use audit_log::{
    AuditLogWriter, ComplianceLogEntry, ComplianceLogStore, LogEntryRequest, LogStatus, ScanOutcome,
    file_report,
};
pub use config::{AuditConfig, ConfigOverrides};
pub use client::SupabaseClient;
pub use server::{ComplianceService, JsonRpcServer};
