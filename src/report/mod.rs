mod types;
mod table;

pub use types::{Report, UserMfaRecord, TableSecurityRecord};
pub use table::{UserMfaRow, TableSecurityRow, LogEntryRow};
