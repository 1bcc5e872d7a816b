//! Auditmark Root Library
//!
//! Wires the lifecycle engine to the in-memory ledger and role registry and
//! exposes the lifecycle as JSON-RPC 2.0 methods.
//!
//! The system has no transport-level authentication, so every mutating
//! request names its `caller` account explicitly. Authorization is decided by
//! the role registry and the ledger, never by the transport.

pub mod config;
pub mod error;

pub use config::{RolesConfig, RootConfig, ServerConfig};
pub use error::{RootError, RootResult};

use auditmark_core::{
    Account, BadgeError, BadgeId, CapabilityId, Level, ReportFingerprint, Role,
};
use auditmark_engine::BadgeEngine;
use auditmark_ledger::{InMemoryLedger, InMemoryRoles};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// JSON-RPC types
// ---------------------------------------------------------------------------

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<serde_json::Value>,
    pub id: serde_json::Value,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: serde_json::Value,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Create an error response.
    pub fn error(id: serde_json::Value, code: i64, message: String) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
            id,
        }
    }

    /// Create an error response with additional data.
    pub fn error_with_data(
        id: serde_json::Value,
        code: i64,
        message: String,
        data: serde_json::Value,
    ) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: Some(data),
            }),
            id,
        }
    }

    /// Error response for a lifecycle rejection. `data.kind` carries the
    /// stable variant tag.
    pub fn badge_error(id: serde_json::Value, err: &BadgeError) -> Self {
        Self::error_with_data(
            id,
            rpc_codes::for_badge_error(err),
            err.to_string(),
            serde_json::json!({ "kind": err.code() }),
        )
    }
}

// ---------------------------------------------------------------------------
// JSON-RPC error codes (standard + lifecycle)
// ---------------------------------------------------------------------------

pub mod rpc_codes {
    use auditmark_core::BadgeError;

    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    pub const UNAUTHORIZED: i64 = -32010;
    pub const INVALID_HOLDER: i64 = -32011;
    pub const INVALID_METADATA: i64 = -32012;
    pub const DUPLICATE_FINGERPRINT: i64 = -32013;
    pub const UNKNOWN_IDENTIFIER: i64 = -32014;
    pub const NOT_ACTIVE: i64 = -32015;
    pub const NON_TRANSFERABLE: i64 = -32016;
    pub const APPROVALS_DISABLED: i64 = -32017;
    pub const ALREADY_ASSIGNED: i64 = -32018;
    pub const CONFIGURATION: i64 = -32019;
    pub const STORAGE: i64 = -32020;

    pub fn for_badge_error(err: &BadgeError) -> i64 {
        match err {
            BadgeError::Unauthorized(_) => UNAUTHORIZED,
            BadgeError::InvalidHolder => INVALID_HOLDER,
            BadgeError::InvalidMetadata(_) => INVALID_METADATA,
            BadgeError::DuplicateFingerprint(_) => DUPLICATE_FINGERPRINT,
            BadgeError::UnknownIdentifier(_) => UNKNOWN_IDENTIFIER,
            BadgeError::NotActive(_) => NOT_ACTIVE,
            BadgeError::NonTransferable(_) => NON_TRANSFERABLE,
            BadgeError::ApprovalsDisabled => APPROVALS_DISABLED,
            BadgeError::AlreadyAssigned(_) => ALREADY_ASSIGNED,
            BadgeError::Configuration(_) => CONFIGURATION,
            BadgeError::Storage(_) => STORAGE,
        }
    }
}

// ---------------------------------------------------------------------------
// Root state
// ---------------------------------------------------------------------------

/// Runtime state: the engine and the registry it was built over.
///
/// The ledger is held only by the engine; every holder change goes through
/// a lifecycle operation.
pub struct RootState {
    pub config: RootConfig,
    pub engine: BadgeEngine,
    roles: Arc<InMemoryRoles>,
}

/// Validate the configuration, seed the role registry, and build the engine
/// over a fresh ledger.
pub fn initialize_root(config: RootConfig) -> RootResult<RootState> {
    config.validate()?;

    info!(
        administrators = config.roles.administrators.len(),
        issuers = config.roles.issuers.len(),
        require_admin_reason = config.engine.require_admin_reason,
        "initializing auditmark root"
    );

    let roles = Arc::new(InMemoryRoles::new());
    for admin in &config.roles.administrators {
        roles.seed(Role::Administrator, *admin)?;
    }
    for issuer in &config.roles.issuers {
        roles.seed(Role::Issuer, *issuer)?;
    }

    let ledger = Arc::new(InMemoryLedger::new());
    let engine = BadgeEngine::new(ledger, roles.clone(), config.engine.clone())?;

    info!("auditmark root initialized");

    Ok(RootState {
        config,
        engine,
        roles,
    })
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

enum Failure {
    Params(String),
    Badge(BadgeError),
    Internal(String),
}

impl From<BadgeError> for Failure {
    fn from(e: BadgeError) -> Self {
        Failure::Badge(e)
    }
}

impl From<serde_json::Error> for Failure {
    fn from(e: serde_json::Error) -> Self {
        Failure::Internal(e.to_string())
    }
}

type Handled = Result<serde_json::Value, Failure>;

fn params<T: DeserializeOwned>(request: &JsonRpcRequest) -> Result<T, Failure> {
    let raw = request
        .params
        .clone()
        .unwrap_or_else(|| serde_json::json!({}));
    serde_json::from_value(raw).map_err(|e| Failure::Params(e.to_string()))
}

/// Route a JSON-RPC request to the engine and wrap the outcome.
pub fn handle_request(state: &RootState, request: &JsonRpcRequest) -> JsonRpcResponse {
    if request.jsonrpc != "2.0" {
        return JsonRpcResponse::error(
            request.id.clone(),
            rpc_codes::INVALID_REQUEST,
            format!("unsupported JSON-RPC version: {}", request.jsonrpc),
        );
    }

    debug!(method = %request.method, "handling request");

    let outcome = match request.method.as_str() {
        "initialize" => handle_initialize(state),
        "badge/mint" => handle_mint(state, request),
        "badge/self_revoke" => handle_self_revoke(state, request),
        "badge/admin_revoke" => handle_admin_revoke(state, request),
        "badge/transfer" => handle_transfer(state, request),
        "badge/approve" => handle_approve(state, request),
        "badge/set_approval_for_all" => handle_set_approval_for_all(state, request),
        "badge/get" => handle_get(state, request),
        "badge/resolve_uri" => handle_resolve_uri(state, request),
        "badge/is_locked" => handle_is_locked(state, request),
        "badge/status" => handle_status(state, request),
        "badge/holder_of" => handle_holder_of(state, request),
        "badge/balance_of" => handle_balance_of(state, request),
        "badge/get_approved" => handle_get_approved(state, request),
        "badge/is_approved_for_all" => handle_is_approved_for_all(state, request),
        "badge/fingerprint_used" => handle_fingerprint_used(state, request),
        "badge/supports" => handle_supports(state, request),
        "badge/stats" => handle_stats(state),
        "badge/events" => handle_events(state),
        "roles/grant" => handle_role_grant(state, request),
        "roles/revoke" => handle_role_revoke(state, request),
        "roles/renounce" => handle_role_renounce(state, request),
        "roles/members" => handle_role_members(state, request),
        other => {
            warn!(method = %other, "unknown method");
            return JsonRpcResponse::error(
                request.id.clone(),
                rpc_codes::METHOD_NOT_FOUND,
                format!("unknown method: {}", other),
            );
        }
    };

    match outcome {
        Ok(result) => JsonRpcResponse::success(request.id.clone(), result),
        Err(Failure::Params(msg)) => JsonRpcResponse::error(
            request.id.clone(),
            rpc_codes::INVALID_PARAMS,
            format!("invalid params: {}", msg),
        ),
        Err(Failure::Badge(e)) => JsonRpcResponse::badge_error(request.id.clone(), &e),
        Err(Failure::Internal(msg)) => {
            JsonRpcResponse::error(request.id.clone(), rpc_codes::INTERNAL_ERROR, msg)
        }
    }
}

// ---------------------------------------------------------------------------
// Request handlers (internal)
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct MintParams {
    caller: Account,
    holder: Account,
    level: Level,
    fingerprint: ReportFingerprint,
    uri: String,
}

#[derive(Deserialize)]
struct CallerIdParams {
    caller: Account,
    id: BadgeId,
}

#[derive(Deserialize)]
struct AdminRevokeParams {
    caller: Account,
    id: BadgeId,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Deserialize)]
struct TransferParams {
    caller: Account,
    from: Account,
    to: Account,
    id: BadgeId,
}

#[derive(Deserialize)]
struct ApproveParams {
    caller: Account,
    spender: Account,
    id: BadgeId,
}

#[derive(Deserialize)]
struct OperatorParams {
    caller: Account,
    operator: Account,
    approved: bool,
}

#[derive(Deserialize)]
struct IdParams {
    id: BadgeId,
}

#[derive(Deserialize)]
struct HolderParams {
    holder: Account,
}

#[derive(Deserialize)]
struct OwnerOperatorParams {
    owner: Account,
    operator: Account,
}

#[derive(Deserialize)]
struct FingerprintParams {
    fingerprint: ReportFingerprint,
}

#[derive(Deserialize)]
struct CapabilityParams {
    capability: CapabilityId,
}

#[derive(Deserialize)]
struct RoleChangeParams {
    caller: Account,
    role: Role,
    account: Account,
}

#[derive(Deserialize)]
struct RenounceParams {
    caller: Account,
    role: Role,
}

#[derive(Deserialize)]
struct RoleParams {
    role: Role,
}

fn handle_initialize(state: &RootState) -> Handled {
    Ok(serde_json::json!({
        "serverInfo": {
            "name": state.config.server.server_name,
            "version": state.config.server.server_version,
        },
        "capabilities": [
            CapabilityId::INTROSPECTION,
            CapabilityId::OWNERSHIP,
            CapabilityId::OWNERSHIP_METADATA,
            CapabilityId::ROLE_REGISTRY,
            CapabilityId::SOULBOUND,
        ],
    }))
}

fn handle_mint(state: &RootState, request: &JsonRpcRequest) -> Handled {
    let p: MintParams = params(request)?;
    let id = state
        .engine
        .mint_credential(&p.caller, &p.holder, p.level, p.fingerprint, &p.uri)?;
    Ok(serde_json::json!({ "id": id }))
}

fn handle_self_revoke(state: &RootState, request: &JsonRpcRequest) -> Handled {
    let p: CallerIdParams = params(request)?;
    state.engine.self_revoke(&p.caller, p.id)?;
    Ok(serde_json::json!({ "id": p.id, "revoked": true }))
}

fn handle_admin_revoke(state: &RootState, request: &JsonRpcRequest) -> Handled {
    let p: AdminRevokeParams = params(request)?;
    state
        .engine
        .admin_revoke(&p.caller, p.id, p.reason.as_deref())?;
    Ok(serde_json::json!({ "id": p.id, "revoked": true }))
}

fn handle_transfer(state: &RootState, request: &JsonRpcRequest) -> Handled {
    let p: TransferParams = params(request)?;
    state.engine.transfer_from(&p.caller, &p.from, &p.to, p.id)?;
    Ok(serde_json::json!({ "transferred": true }))
}

fn handle_approve(state: &RootState, request: &JsonRpcRequest) -> Handled {
    let p: ApproveParams = params(request)?;
    state.engine.approve(&p.caller, &p.spender, p.id)?;
    Ok(serde_json::json!({ "approved": true }))
}

fn handle_set_approval_for_all(state: &RootState, request: &JsonRpcRequest) -> Handled {
    let p: OperatorParams = params(request)?;
    state
        .engine
        .set_approval_for_all(&p.caller, &p.operator, p.approved)?;
    Ok(serde_json::json!({ "approved": p.approved }))
}

fn handle_get(state: &RootState, request: &JsonRpcRequest) -> Handled {
    let p: IdParams = params(request)?;
    let record = state.engine.get(p.id)?;
    let mut value = serde_json::to_value(&record)?;
    value["status"] = serde_json::to_value(record.status())?;
    value["issued_at_rfc3339"] = serde_json::Value::String(record.issued_at().to_rfc3339());
    Ok(value)
}

fn handle_resolve_uri(state: &RootState, request: &JsonRpcRequest) -> Handled {
    let p: IdParams = params(request)?;
    let uri = state.engine.resolve_metadata_uri(p.id)?;
    Ok(serde_json::json!({ "uri": uri }))
}

fn handle_is_locked(state: &RootState, request: &JsonRpcRequest) -> Handled {
    let p: IdParams = params(request)?;
    Ok(serde_json::json!({ "locked": state.engine.is_locked(p.id)? }))
}

fn handle_status(state: &RootState, request: &JsonRpcRequest) -> Handled {
    let p: IdParams = params(request)?;
    Ok(serde_json::json!({ "status": state.engine.status(p.id)? }))
}

fn handle_holder_of(state: &RootState, request: &JsonRpcRequest) -> Handled {
    let p: IdParams = params(request)?;
    Ok(serde_json::json!({ "holder": state.engine.holder_of(p.id)? }))
}

fn handle_balance_of(state: &RootState, request: &JsonRpcRequest) -> Handled {
    let p: HolderParams = params(request)?;
    Ok(serde_json::json!({ "balance": state.engine.balance_of(&p.holder)? }))
}

fn handle_get_approved(state: &RootState, request: &JsonRpcRequest) -> Handled {
    let p: IdParams = params(request)?;
    Ok(serde_json::json!({ "approved": state.engine.get_approved(p.id)? }))
}

fn handle_is_approved_for_all(state: &RootState, request: &JsonRpcRequest) -> Handled {
    let p: OwnerOperatorParams = params(request)?;
    let approved = state.engine.is_approved_for_all(&p.owner, &p.operator)?;
    Ok(serde_json::json!({ "approved": approved }))
}

fn handle_fingerprint_used(state: &RootState, request: &JsonRpcRequest) -> Handled {
    let p: FingerprintParams = params(request)?;
    let used = state.engine.is_fingerprint_used(&p.fingerprint)?;
    Ok(serde_json::json!({ "used": used }))
}

fn handle_supports(state: &RootState, request: &JsonRpcRequest) -> Handled {
    let p: CapabilityParams = params(request)?;
    let supported = state.engine.supports_capability(p.capability);
    Ok(serde_json::json!({ "capability": p.capability, "supported": supported }))
}

fn handle_stats(state: &RootState) -> Handled {
    Ok(serde_json::json!({
        "total_issued": state.engine.total_issued()?,
        "live": state.engine.live_count()?,
        "events": state.engine.events()?.len(),
        "event_head": state.engine.event_head()?,
        "chain_valid": state.engine.verify_events()?,
    }))
}

fn handle_events(state: &RootState) -> Handled {
    let entries = state.engine.events()?;
    Ok(serde_json::json!({
        "total": entries.len(),
        "entries": entries,
    }))
}

fn handle_role_grant(state: &RootState, request: &JsonRpcRequest) -> Handled {
    let p: RoleChangeParams = params(request)?;
    let changed = state.roles.grant_role(&p.caller, p.role, p.account)?;
    Ok(serde_json::json!({ "changed": changed }))
}

fn handle_role_revoke(state: &RootState, request: &JsonRpcRequest) -> Handled {
    let p: RoleChangeParams = params(request)?;
    let changed = state.roles.revoke_role(&p.caller, p.role, &p.account)?;
    Ok(serde_json::json!({ "changed": changed }))
}

fn handle_role_renounce(state: &RootState, request: &JsonRpcRequest) -> Handled {
    let p: RenounceParams = params(request)?;
    let changed = state.roles.renounce_role(&p.caller, p.role)?;
    Ok(serde_json::json!({ "changed": changed }))
}

fn handle_role_members(state: &RootState, request: &JsonRpcRequest) -> Handled {
    let p: RoleParams = params(request)?;
    Ok(serde_json::json!({ "role": p.role, "members": state.roles.members(p.role)? }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
