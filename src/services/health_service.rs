//! Health reporting for the `/healthcheck` route.

use crate::{dto::health::HealthResponse, state::SharedState};

/// Snapshot server liveness and the live room count.
pub async fn healthcheck(state: &SharedState) -> HealthResponse {
    HealthResponse::ok(state.room_count().await)
}
