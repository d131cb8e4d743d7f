mod protocol;
mod server;

pub use protocol::{
    JsonRpcRequest, JsonRpcResponse, JsonRpcError,
    PARSE_ERROR, INVALID_REQUEST, METHOD_NOT_FOUND, INVALID_PARAMS, INTERNAL_ERROR, UPSTREAM_UNAVAILABLE,
};
pub use server::{ComplianceService, JsonRpcServer, error_code_for};
