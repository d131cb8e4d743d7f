mod retry;
mod scanner;

pub use retry::RetryPolicy;
pub use scanner::{ComplianceScanner, ScanOptions};
