mod source;
mod users;
mod tables;

pub use source::{
    UserDirectory, SecurityCatalog,
    DirectoryUser, AuthFactor, PublicTable, PolicyRow,
};
pub use users::{list_user_mfa_status, has_totp_factor};
pub use tables::{TableSecurityInspector, table_record, fail_closed_record};
