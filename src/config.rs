use std::fs;
use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::audit_log::DEFAULT_LOG_TABLE;
use crate::error::{AuditError, Result};
use crate::policy::PlanTier;
use crate::scan::{RetryPolicy, ScanOptions};

pub const DEFAULT_OPERATOR_EMAIL: &str = "customer@example.com";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 200,
            max_delay_ms: 2_000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_attempts(self.max_attempts)
            .with_delays(
                Duration::from_millis(self.base_delay_ms),
                Duration::from_millis(self.max_delay_ms),
            )
    }
}

/// Process configuration. Read once at startup; the plan tier in particular
/// never comes from a request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub project_url: Option<String>,
    pub service_role_key: Option<String>,
    pub plan_type: Option<String>,
    pub max_concurrency: Option<usize>,
    pub scan_timeout_secs: Option<u64>,
    pub request_timeout_secs: u64,
    pub log_table: String,
    pub operator_email: String,
    pub retry: RetryConfig,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            project_url: None,
            service_role_key: None,
            plan_type: None,
            max_concurrency: None,
            scan_timeout_secs: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            log_table: DEFAULT_LOG_TABLE.to_string(),
            operator_email: DEFAULT_OPERATOR_EMAIL.to_string(),
            retry: RetryConfig::default(),
        }
    }
}

impl std::fmt::Debug for AuditConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditConfig")
            .field("project_url", &self.project_url)
            .field("service_role_key", &self.service_role_key.as_ref().map(|_| "***"))
            .field("plan_type", &self.plan_type)
            .field("max_concurrency", &self.max_concurrency)
            .field("scan_timeout_secs", &self.scan_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("log_table", &self.log_table)
            .field("operator_email", &self.operator_email)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Values from flags or the environment. Anything set here beats the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub project_url: Option<String>,
    pub service_role_key: Option<String>,
    pub plan_type: Option<String>,
    pub max_concurrency: Option<usize>,
    pub scan_timeout_secs: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub operator_email: Option<String>,
}

impl AuditConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|_| AuditError::Config(format!("Config file not found: {}", path.display())))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Loads `path` when given, otherwise starts from defaults, then layers the overrides.
    pub fn resolve(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let base = match path {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        Ok(base.merge(overrides))
    }

    pub fn merge(mut self, overrides: ConfigOverrides) -> Self {
        if overrides.project_url.is_some() {
            self.project_url = overrides.project_url;
        }
        if overrides.service_role_key.is_some() {
            self.service_role_key = overrides.service_role_key;
        }
        if overrides.plan_type.is_some() {
            self.plan_type = overrides.plan_type;
        }
        if overrides.max_concurrency.is_some() {
            self.max_concurrency = overrides.max_concurrency;
        }
        if overrides.scan_timeout_secs.is_some() {
            self.scan_timeout_secs = overrides.scan_timeout_secs;
        }
        if let Some(attempts) = overrides.retry_attempts {
            self.retry.max_attempts = attempts;
        }
        if let Some(email) = overrides.operator_email {
            self.operator_email = email;
        }
        self
    }

    /// Required before anything talks to the network.
    pub fn validate(&self) -> Result<()> {
        match self.project_url.as_deref().map(str::trim) {
            None | Some("") => {
                return Err(AuditError::Config(
                    "project URL is not set (use --url or SUPABASE_URL)".to_string(),
                ))
            }
            Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
                return Err(AuditError::Config(format!(
                    "project URL must start with http:// or https://, got '{}'",
                    url
                )))
            }
            Some(_) => {}
        }

        if self.service_role_key.as_deref().map(str::trim).unwrap_or("").is_empty() {
            return Err(AuditError::Config(
                "service role key is not set (use --service-role-key or SUPABASE_SERVICE_ROLE_KEY)".to_string(),
            ));
        }

        if self.log_table.trim().is_empty() {
            return Err(AuditError::Config("log_table must not be empty".to_string()));
        }

        if self.request_timeout_secs == 0 {
            return Err(AuditError::Config("request_timeout_secs must be greater than 0".to_string()));
        }

        Ok(())
    }

    pub fn plan_tier(&self) -> PlanTier {
        PlanTier::parse(self.plan_type.as_deref())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            max_concurrency: self.max_concurrency,
            timeout: self.scan_timeout_secs.filter(|s| *s > 0).map(Duration::from_secs),
            retry: self.retry.policy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn complete() -> AuditConfig {
        AuditConfig {
            project_url: Some("https://abc.supabase.co".into()),
            service_role_key: Some("service".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = AuditConfig::default();
        assert_eq!(config.log_table, "compliance_logs");
        assert_eq!(config.operator_email, "customer@example.com");
        assert_eq!(config.plan_tier(), PlanTier::Free);
        assert_eq!(config.scan_options().timeout, None);
        assert_eq!(config.scan_options().retry.max_attempts, 1);
    }

    #[test]
    fn test_load_partial_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "project_url: https://abc.supabase.co\nplan_type: Enterprise\nmax_concurrency: 8\nretry:\n  max_attempts: 3"
        )
        .unwrap();

        let config = AuditConfig::load(file.path()).unwrap();
        assert_eq!(config.project_url.as_deref(), Some("https://abc.supabase.co"));
        assert_eq!(config.plan_tier(), PlanTier::Enterprise);
        assert_eq!(config.max_concurrency, Some(8));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay_ms, 200);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_missing_file() {
        let err = AuditConfig::load("/nonexistent/supaudit.yaml").unwrap_err();
        assert!(matches!(err, AuditError::Config(_)));
    }

    #[test]
    fn test_overrides_beat_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "plan_type: Pro\noperator_email: file@example.com").unwrap();

        let config = AuditConfig::resolve(
            Some(file.path()),
            ConfigOverrides {
                plan_type: Some("Enterprise".into()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(config.plan_type.as_deref(), Some("Enterprise"));
        assert_eq!(config.operator_email, "file@example.com");
    }

    #[test]
    fn test_validate() {
        assert!(complete().validate().is_ok());

        let mut config = complete();
        config.project_url = None;
        assert!(matches!(config.validate(), Err(AuditError::Config(_))));

        let mut config = complete();
        config.project_url = Some("abc.supabase.co".into());
        assert!(config.validate().is_err());

        let mut config = complete();
        config.service_role_key = Some("  ".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_disables_scan_deadline() {
        let config = AuditConfig {
            scan_timeout_secs: Some(0),
            ..complete()
        };
        assert_eq!(config.scan_options().timeout, None);
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", complete());
        assert!(!rendered.contains("service\""));
        assert!(rendered.contains("***"));
    }
}
