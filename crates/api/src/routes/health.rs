//! Liveness probe.

use axum::Json;
use serde::Serialize;

/// Body returned by the liveness probe.
#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
}

/// GET /health.
///
/// Reports that the process is accepting requests. Storage is not
/// probed here, so a healthy response says nothing about the database.
pub async fn check() -> Json<Health> {
    Json(Health { status: "ok" })
}
