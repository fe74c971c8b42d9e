use crate::app_error::{AppError, AppResult};
use crate::sync_endpoint::{
    EndpointResponse, SyncScoreAckV1, SyncScoreEndpoint, SyncScoreRequestV1, SYNC_SCORE_ROUTE,
};
use crate::types::Identity;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncTargetUri {
    /// Server-of-record database reachable from this process.
    SqlitePath { path: String },
}

impl SyncTargetUri {
    pub fn parse(raw: &str) -> AppResult<Self> {
        if raw.trim().is_empty() {
            return Err(AppError::new(
                "LL_SYNC_TARGET_INVALID",
                "sync",
                "sync target is required",
                false,
                serde_json::json!({ "target": raw }),
            ));
        }

        if let Some(rest) = raw.strip_prefix("sqlite://") {
            if rest.trim().is_empty() {
                return Err(AppError::new(
                    "LL_SYNC_TARGET_INVALID",
                    "sync",
                    "sqlite target missing path",
                    false,
                    serde_json::json!({ "target": raw }),
                ));
            }
            return Ok(SyncTargetUri::SqlitePath {
                path: rest.to_string(),
            });
        }

        if raw.contains("://") {
            return Err(AppError::new(
                "LL_SYNC_TARGET_UNSUPPORTED",
                "sync",
                "unsupported sync target scheme",
                false,
                serde_json::json!({ "target": raw }),
            ));
        }

        Ok(SyncTargetUri::SqlitePath {
            path: raw.to_string(),
        })
    }

    pub fn display(&self) -> String {
        match self {
            SyncTargetUri::SqlitePath { path } => format!("sqlite://{}", path),
        }
    }
}

/// Client-side seam to the reconciliation endpoint.
pub trait SyncTransport: Send + Sync {
    fn target(&self) -> String;
    fn submit(&self, identity: &Identity, request: &SyncScoreRequestV1) -> AppResult<SyncScoreAckV1>;
}

pub fn transport_for_target(raw: &str) -> AppResult<Box<dyn SyncTransport>> {
    match SyncTargetUri::parse(raw)? {
        SyncTargetUri::SqlitePath { path } => {
            Ok(Box::new(InProcessSyncTransport::new(PathBuf::from(path))))
        }
    }
}

/// Drives the endpoint handler directly, going through the same JSON encoding a
/// network hop would.
#[derive(Debug, Clone)]
pub struct InProcessSyncTransport {
    db_path: PathBuf,
    endpoint: SyncScoreEndpoint,
}

impl InProcessSyncTransport {
    pub fn new(db_path: PathBuf) -> Self {
        let endpoint = SyncScoreEndpoint::new(&db_path);
        Self { db_path, endpoint }
    }
}

fn rejected(response: &EndpointResponse) -> AppError {
    let retryable = response.status >= 500;
    let code = if retryable {
        "LL_SYNC_TRANSPORT_FAILED"
    } else {
        "LL_SYNC_REJECTED"
    };
    AppError::new(
        code,
        "sync",
        "sync endpoint returned a non-success status",
        retryable,
        serde_json::json!({
            "route": SYNC_SCORE_ROUTE,
            "status": response.status,
            "body": response.body,
        }),
    )
}

impl SyncTransport for InProcessSyncTransport {
    fn target(&self) -> String {
        SyncTargetUri::SqlitePath {
            path: self.db_path.display().to_string(),
        }
        .display()
    }

    fn submit(&self, identity: &Identity, request: &SyncScoreRequestV1) -> AppResult<SyncScoreAckV1> {
        let body = serde_json::to_vec(request).map_err(|e| {
            AppError::new(
                "LL_SYNC_TRANSPORT_FAILED",
                "sync",
                "failed serializing sync request",
                false,
                serde_json::json!({ "error": e.to_string() }),
            )
        })?;

        let response = self.endpoint.handle(Some(identity), &body);
        if !response.is_success() {
            return Err(rejected(&response));
        }

        serde_json::from_value(response.body.clone()).map_err(|e| {
            AppError::new(
                "LL_SYNC_TRANSPORT_FAILED",
                "sync",
                "failed parsing sync acknowledgement",
                true,
                serde_json::json!({ "error": e.to_string(), "body": response.body }),
            )
        })
    }
}
