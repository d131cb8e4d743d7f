mod entry;
mod writer;

pub use entry::{ComplianceLogEntry, LogEntryRequest};
pub use writer::{file_report, AuditLogWriter, ComplianceLogStore, LogStatus, ScanOutcome, DEFAULT_LOG_TABLE};
