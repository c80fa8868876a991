use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub credentials: CredentialHealth,
    pub jobs: JobHealth,
}

#[derive(Serialize)]
pub struct CredentialHealth {
    pub status: String,
    pub configured: usize,
}

#[derive(Serialize)]
pub struct JobHealth {
    pub tracked: usize,
}

/// GET /health — liveness plus credential-pool configuration.
///
/// An empty credential pool means every submitted job will fail, so the
/// service reports degraded with 503 until at least one provider key is
/// configured.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let configured = state.credentials.len();
    let credentials_ok = configured > 0;

    let response = HealthResponse {
        status: if credentials_ok { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            credentials: CredentialHealth {
                status: if credentials_ok { "ok" } else { "unconfigured" }.to_string(),
                configured,
            },
            jobs: JobHealth {
                tracked: state.registry.count().await,
            },
        },
    };

    let status_code = if credentials_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
