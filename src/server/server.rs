use std::sync::Arc;
use chrono::Utc;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use crate::audit_log::{AuditLogWriter, LogEntryRequest};
use crate::error::{AuditError, Result};
use crate::scan::ComplianceScanner;
use super::protocol::{
    JsonRpcRequest, JsonRpcResponse, INTERNAL_ERROR, INVALID_PARAMS, UPSTREAM_UNAVAILABLE,
};

const LOG_BODY_REJECTED: &str = "Failed to log compliance results";

/// Request handling for the scan and log endpoints, independent of the transport.
#[derive(Clone)]
pub struct ComplianceService {
    scanner: Arc<ComplianceScanner>,
    log: AuditLogWriter,
}

impl ComplianceService {
    pub fn new(scanner: Arc<ComplianceScanner>, log: AuditLogWriter) -> Self {
        Self { scanner, log }
    }

    /// Parses and handles one line. The flag is true when the caller asked to exit.
    pub async fn handle_line(&self, line: &str) -> (JsonRpcResponse, bool) {
        match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => {
                let exit = matches!(request.method.as_str(), "exit" | "quit");
                (self.handle(request).await, exit)
            }
            Err(_) => (JsonRpcResponse::parse_error(), false),
        }
    }

    pub async fn handle(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        if !request.is_valid() {
            return JsonRpcResponse::invalid_request(request.id);
        }

        debug!(method = %request.method, "Dispatching request");
        match request.method.as_str() {
            "run_compliance" => self.run_compliance(&request).await,
            "log_compliance" => self.log_compliance(&request).await,
            "list_logs" => self.list_logs(&request).await,
            "ping" => JsonRpcResponse::success(request.id.clone(), json!({"pong": true})),
            "exit" | "quit" => JsonRpcResponse::success(request.id.clone(), json!({"exiting": true})),
            other => JsonRpcResponse::method_not_found(request.id.clone(), other),
        }
    }

    async fn run_compliance(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        match self.scanner.run_scan(request.param_str("apiKey")).await {
            Ok(report) => match serde_json::to_value(&report) {
                Ok(Value::Object(mut body)) => {
                    body.insert("success".to_string(), Value::Bool(true));
                    JsonRpcResponse::success(request.id.clone(), Value::Object(body))
                }
                _ => JsonRpcResponse::failure(request.id.clone(), INTERNAL_ERROR, "Bad request"),
            },
            Err(e) => error_response(request.id.clone(), &e),
        }
    }

    async fn log_compliance(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        let body = request.params.clone().unwrap_or(Value::Null);
        let entry = match serde_json::from_value::<LogEntryRequest>(body) {
            Ok(req) => req.into_entry(Utc::now()),
            Err(e) => {
                warn!("Rejected log body: {}", e);
                return JsonRpcResponse::failure(id, INVALID_PARAMS, LOG_BODY_REJECTED);
            }
        };

        match self.log.append_log(&entry).await {
            Ok(()) => JsonRpcResponse::success(id, json!({"success": true})),
            Err(e) => error_response(id, &e),
        }
    }

    async fn list_logs(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let limit = request
            .params
            .as_ref()
            .and_then(|p| p.get("limit"))
            .and_then(Value::as_u64)
            .map(|n| n as usize);

        match self.log.list_logs(limit).await {
            Ok(logs) => JsonRpcResponse::success(
                request.id.clone(),
                json!({"success": true, "logs": logs}),
            ),
            Err(e) => error_response(request.id.clone(), &e),
        }
    }
}

pub fn error_code_for(err: &AuditError) -> i32 {
    match err {
        e if e.is_client_error() => INVALID_PARAMS,
        AuditError::DirectoryUnavailable(_)
        | AuditError::CatalogUnavailable(_)
        | AuditError::LogWrite(_)
        | AuditError::LogRead(_)
        | AuditError::Timeout { .. } => UPSTREAM_UNAVAILABLE,
        _ => INTERNAL_ERROR,
    }
}

fn error_response(id: Option<Value>, err: &AuditError) -> JsonRpcResponse {
    JsonRpcResponse::failure(id, error_code_for(err), err.public_message())
}

/// Line-delimited JSON-RPC over stdin/stdout.
pub struct JsonRpcServer;

impl JsonRpcServer {
    pub async fn run(service: ComplianceService) -> Result<()> {
        let (response_tx, mut response_rx) = mpsc::unbounded_channel::<JsonRpcResponse>();

        let stdout = tokio::io::stdout();
        let writer = tokio::spawn(async move {
            let mut stdout = BufWriter::new(stdout);
            while let Some(response) = response_rx.recv().await {
                if let Ok(json) = serde_json::to_string(&response) {
                    let _ = stdout.write_all(json.as_bytes()).await;
                    let _ = stdout.write_all(b"\n").await;
                    let _ = stdout.flush().await;
                }
            }
        });

        info!("Compliance server listening on stdin");

        let reader = BufReader::new(tokio::io::stdin());
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let (response, should_exit) = service.handle_line(&line).await;
            let _ = response_tx.send(response);
            if should_exit {
                break;
            }
        }

        drop(response_tx);
        let _ = writer.await;
        info!("Compliance server stopped");
        Ok(())
    }
}
