use std::time::Duration;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use crate::audit_log::{ComplianceLogEntry, ComplianceLogStore, DEFAULT_LOG_TABLE};
use crate::config::AuditConfig;
use crate::credential::Credential;
use crate::error::{from_reqwest, AuditError, ErrorContext, Result, UpstreamError};
use crate::inspector::{DirectoryUser, PolicyRow, PublicTable, SecurityCatalog, UserDirectory};
use super::http::{check_response, read_json};

const DEFAULT_PAGE_SIZE: u32 = 1000;
const MAX_USER_PAGES: u32 = 1000;

/// A short page ends the listing. The page cap guards against a directory
/// that keeps returning full pages.
fn is_last_page(fetched: usize, page_size: u32, page: u32) -> bool {
    fetched < page_size as usize || page >= MAX_USER_PAGES
}

#[derive(Debug, Deserialize)]
struct UsersPage {
    #[serde(default)]
    users: Vec<DirectoryUser>,
}

/// REST client for one Supabase project.
///
/// The user listing authenticates with the key supplied for the scan. Catalog
/// introspection and the compliance log use the service-role key.
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
    log_table: String,
    page_size: u32,
}

impl SupabaseClient {
    pub fn new(
        project_url: impl Into<String>,
        service_role_key: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| AuditError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: project_url.into().trim_end_matches('/').to_string(),
            service_key: service_role_key.into(),
            log_table: DEFAULT_LOG_TABLE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    pub fn from_config(config: &AuditConfig) -> Result<Self> {
        config.validate()?;
        let url = config.project_url.clone().unwrap_or_default();
        let key = config.service_role_key.clone().unwrap_or_default();
        Ok(Self::new(url, key, config.request_timeout())?.with_log_table(&config.log_table))
    }

    pub fn with_log_table(mut self, table: impl Into<String>) -> Self {
        self.log_table = table.into();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn users_url(&self, page: u32) -> String {
        self.endpoint(&format!("auth/v1/admin/users?page={}&per_page={}", page, self.page_size))
    }

    fn policies_url(&self, table: &str) -> String {
        self.endpoint(&format!(
            "rest/v1/pg_policies?select=*&tablename=eq.{}",
            urlencoding::encode(table)
        ))
    }

    fn logs_url(&self, limit: Option<usize>) -> String {
        let mut url = self.endpoint(&format!(
            "rest/v1/{}?select=*&order=created_at.desc",
            urlencoding::encode(&self.log_table)
        ));
        if let Some(n) = limit {
            url.push_str(&format!("&limit={}", n));
        }
        url
    }

    fn authed(&self, builder: reqwest::RequestBuilder, key: &str) -> reqwest::RequestBuilder {
        builder.header("apikey", key).bearer_auth(key)
    }

    async fn rpc<T: serde::de::DeserializeOwned>(
        &self,
        function: &str,
        body: serde_json::Value,
    ) -> std::result::Result<T, UpstreamError> {
        let resource = format!("rpc/{}", function);
        let ctx = ErrorContext::new().with_operation(function).with_resource(&resource);

        let resp = self
            .authed(self.http.post(self.endpoint(&format!("rest/v1/{}", resource))), &self.service_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| from_reqwest(e, ctx.clone()))?;

        read_json(resp, ctx).await
    }
}

#[async_trait]
impl UserDirectory for SupabaseClient {
    async fn list_users(&self, credential: &Credential) -> std::result::Result<Vec<DirectoryUser>, UpstreamError> {
        let ctx = ErrorContext::new()
            .with_operation("list_users")
            .with_resource("auth/v1/admin/users");

        let mut users = Vec::new();
        let mut page = 1;
        loop {
            let resp = self
                .authed(self.http.get(self.users_url(page)), credential.expose())
                .send()
                .await
                .map_err(|e| from_reqwest(e, ctx.clone()))?;

            let batch: UsersPage = read_json(resp, ctx.clone()).await?;
            let fetched = batch.users.len();
            debug!(page, fetched, "Fetched user page");
            users.extend(batch.users);

            if is_last_page(fetched, self.page_size, page) {
                if fetched >= self.page_size as usize {
                    warn!(page, users = users.len(), "User listing hit the page cap, stopping");
                }
                break;
            }
            page += 1;
        }

        Ok(users)
    }
}

#[async_trait]
impl SecurityCatalog for SupabaseClient {
    async fn list_public_tables(&self) -> std::result::Result<Vec<PublicTable>, UpstreamError> {
        self.rpc("get_public_tables", json!({})).await
    }

    async fn rls_enabled(&self, table: &str) -> std::result::Result<Option<bool>, UpstreamError> {
        self.rpc("check_rls_enabled", json!({ "table_name": table })).await
    }

    async fn list_policies(&self, table: &str) -> std::result::Result<Vec<PolicyRow>, UpstreamError> {
        let ctx = ErrorContext::new()
            .with_operation("list_policies")
            .with_resource("pg_policies");

        let resp = self
            .authed(self.http.get(self.policies_url(table)), &self.service_key)
            .send()
            .await
            .map_err(|e| from_reqwest(e, ctx.clone()))?;

        read_json(resp, ctx).await
    }
}

#[async_trait]
impl ComplianceLogStore for SupabaseClient {
    async fn insert_log(&self, entry: &ComplianceLogEntry) -> std::result::Result<(), UpstreamError> {
        let ctx = ErrorContext::new()
            .with_operation("insert_log")
            .with_resource(&self.log_table);

        let resp = self
            .authed(self.http.post(self.endpoint(&format!("rest/v1/{}", urlencoding::encode(&self.log_table)))), &self.service_key)
            .header("Prefer", "return=minimal")
            .json(entry)
            .send()
            .await
            .map_err(|e| from_reqwest(e, ctx.clone()))?;

        check_response(resp, ctx).await?;
        Ok(())
    }

    async fn fetch_logs(&self, limit: Option<usize>) -> std::result::Result<Vec<ComplianceLogEntry>, UpstreamError> {
        let ctx = ErrorContext::new()
            .with_operation("fetch_logs")
            .with_resource(&self.log_table);

        let resp = self
            .authed(self.http.get(self.logs_url(limit)), &self.service_key)
            .send()
            .await
            .map_err(|e| from_reqwest(e, ctx.clone()))?;

        read_json(resp, ctx).await
    }
}
