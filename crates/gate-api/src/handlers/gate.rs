//! Gate admission handlers: check-in, heartbeat, exit, status.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use tracing::info;
use validator::Validate;

use gate_auth::{hash_ip, hash_nonce};
use gate_entity::{GateSession, NewVisitor, SessionStatus};
use gate_service::PromotionOutcome;

use crate::dto::request::CheckinRequest;
use crate::dto::response::{CheckinResponse, ExitResponse, HeartbeatResponse, StatusResponse};
use crate::error::ApiError;
use crate::extract::{client_ip, ApiJson};
use crate::state::AppState;

/// Name of the credential cookie.
pub const GATE_COOKIE: &str = "gate_pass";

fn set_gate_cookie(jar: CookieJar, credential: String, ttl_ms: u64) -> CookieJar {
    let cookie = Cookie::build((GATE_COOKIE, credential))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::milliseconds(ttl_ms as i64))
        .build();
    jar.add(cookie)
}

fn clear_gate_cookie(jar: CookieJar) -> CookieJar {
    let mut removal = Cookie::from(GATE_COOKIE);
    removal.set_path("/");
    jar.remove(removal)
}

/// Hash of the requesting client's IP, salted per deployment.
fn request_ip_hash(state: &AppState, headers: &HeaderMap) -> String {
    hash_ip(&client_ip(headers), &state.config.gate.ip_salt)
}

/// Run a promotion pass and push its results out through the hub.
async fn promote_and_notify(
    state: &AppState,
    now: DateTime<Utc>,
) -> Result<PromotionOutcome, ApiError> {
    let outcome = state.promotion.promote(now).await?;
    if !outcome.promoted.is_empty() {
        state.hub.notify_promoted(&outcome.promoted).await;
    }
    Ok(outcome)
}

/// Broadcast the current occupancy to WebSocket subscribers.
async fn broadcast_occupancy(state: &AppState, now: DateTime<Utc>) -> Result<(), ApiError> {
    let snap = state.occupancy.snapshot(now).await?;
    state
        .hub
        .broadcast_occupancy(snap.active_count, snap.capacity, snap.queue_length)
        .await;
    Ok(())
}

/// POST /api/gate/checkin
pub async fn checkin(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    ApiJson(body): ApiJson<CheckinRequest>,
) -> Result<Response, ApiError> {
    let now = Utc::now();
    let ip_hash = request_ip_hash(&state, &headers);

    let decision = state.rate_limiter.check(&ip_hash, now);
    if !decision.allowed {
        let retry_after = decision.reset_in_ms.max(0) as u64 / 1000 + 1;
        return Err(ApiError::rate_limited(retry_after));
    }

    if let Err(e) = body.validate() {
        let details = serde_json::to_value(&e).unwrap_or(serde_json::Value::Null);
        return Err(ApiError::validation(details));
    }

    // Bots that fill the honeypot get a success-shaped response and no
    // session, so they cannot tell they were filtered.
    if body.is_bot() {
        let response = CheckinResponse {
            status: SessionStatus::Active,
            pass_token: String::new(),
            token_hash: String::new(),
            queue_position: None,
            occupancy: gate_service::OccupancySnapshot {
                capacity: state.config.gate.capacity,
                active_count: 0,
                queue_length: 0,
                is_full: false,
            },
        };
        return Ok(Json(response).into_response());
    }

    // Free any slots held by stale sessions before deciding admission.
    promote_and_notify(&state, now).await?;

    let minted = state.sealer.mint(&ip_hash, now)?;
    let visitor = NewVisitor {
        display_name: body.display_name,
        email: body.email,
        purpose: body.purpose,
        token_hash: minted.token_hash.clone(),
        ip_hash,
    };

    // The store decides ACTIVE vs QUEUED atomically with its occupancy
    // count, so a racing check-in cannot also take the last slot.
    let session = state
        .store
        .admit_or_queue(
            visitor,
            state.config.gate.capacity,
            state.occupancy.cutoff(now),
            now,
        )
        .await?;

    info!(
        session_id = %session.id,
        status = %session.status,
        "Visitor checked in"
    );

    let occupancy = state.occupancy.snapshot(now).await?;
    let queue_position = if session.status == SessionStatus::Queued {
        state.occupancy.queue_position(session.id).await?
    } else {
        None
    };

    state
        .hub
        .broadcast_occupancy(
            occupancy.active_count,
            occupancy.capacity,
            occupancy.queue_length,
        )
        .await;

    let response = CheckinResponse {
        status: session.status,
        pass_token: minted.credential.clone(),
        token_hash: minted.token_hash,
        queue_position,
        occupancy,
    };
    let jar = set_gate_cookie(jar, minted.credential, state.config.gate.token_ttl_ms);
    Ok((jar, Json(response)).into_response())
}

/// Resolve the caller's session from the credential cookie.
///
/// Returns the cleared jar alongside the error response for every
/// failure that should also discard the client's cookie.
async fn authenticate(
    state: &AppState,
    jar: CookieJar,
    headers: &HeaderMap,
    now: DateTime<Utc>,
) -> Result<(CookieJar, String, GateSession), Response> {
    let Some(credential) = jar.get(GATE_COOKIE).map(|c| c.value().to_string()) else {
        return Err(ApiError::token_missing().into_response());
    };

    let ip_hash = request_ip_hash(state, headers);
    let payload = match state.sealer.verify(&credential, &ip_hash, now) {
        Ok(p) => p,
        Err(_) => {
            return Err((clear_gate_cookie(jar), ApiError::token_invalid()).into_response());
        }
    };
    let token_hash = hash_nonce(&payload.nonce);

    let session = match state.store.find_by_token_hash(&token_hash).await {
        Ok(Some(s)) => s,
        Ok(None) => {
            return Err((clear_gate_cookie(jar), ApiError::session_not_found()).into_response());
        }
        Err(e) => return Err(ApiError::from(e).into_response()),
    };

    if session.status.is_terminal() {
        state
            .hub
            .notify_expired(&token_hash, session.status.as_str())
            .await;
        return Err((
            clear_gate_cookie(jar),
            ApiError::session_expired(session.status.as_str()),
        )
            .into_response());
    }

    Ok((jar, token_hash, session))
}

/// POST /api/gate/heartbeat
pub async fn heartbeat(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let now = Utc::now();
    let (_jar, token_hash, session) = match authenticate(&state, jar, &headers, now).await {
        Ok(ok) => ok,
        Err(response) => return Ok(response),
    };

    state.store.touch(&token_hash, now).await?;
    let outcome = promote_and_notify(&state, now).await?;

    // The pass may have promoted this very session; report its current
    // state, not the pre-promotion one.
    let current = state
        .store
        .find_by_token_hash(&token_hash)
        .await?
        .unwrap_or(session);

    let occupancy = state.occupancy.snapshot(now).await?;
    if outcome.changed_anything() {
        state
            .hub
            .broadcast_occupancy(
                occupancy.active_count,
                occupancy.capacity,
                occupancy.queue_length,
            )
            .await;
    }

    let queue_position = if current.status == SessionStatus::Queued {
        state.occupancy.queue_position(current.id).await?
    } else {
        None
    };

    Ok(Json(HeartbeatResponse {
        status: current.status,
        queue_position,
        occupancy,
    })
    .into_response())
}

/// POST /api/gate/exit
pub async fn exit(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let now = Utc::now();
    let (jar, token_hash, session) = match authenticate(&state, jar, &headers, now).await {
        Ok(ok) => ok,
        Err(response) => return Ok(response),
    };

    state.store.mark_exited(&token_hash).await?;
    info!(session_id = %session.id, "Visitor exited");

    promote_and_notify(&state, now).await?;
    broadcast_occupancy(&state, now).await?;

    let jar = clear_gate_cookie(jar);
    Ok((
        jar,
        Json(ExitResponse {
            status: SessionStatus::Exited,
        }),
    )
        .into_response())
}

/// GET /api/gate/status
pub async fn status(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let now = Utc::now();
    let outcome = promote_and_notify(&state, now).await?;

    let occupancy = state.occupancy.snapshot(now).await?;
    if outcome.changed_anything() {
        state
            .hub
            .broadcast_occupancy(
                occupancy.active_count,
                occupancy.capacity,
                occupancy.queue_length,
            )
            .await;
    }
    let anonymous = StatusResponse {
        occupancy: occupancy.clone(),
        your_status: None,
        queue_position: None,
        is_admin: None,
    };

    // An absent or invalid credential degrades to the anonymous view;
    // status never rejects.
    let Some(credential) = jar.get(GATE_COOKIE).map(|c| c.value().to_string()) else {
        return Ok(Json(anonymous).into_response());
    };
    let ip_hash = request_ip_hash(&state, &headers);
    let Ok(payload) = state.sealer.verify(&credential, &ip_hash, now) else {
        return Ok(Json(anonymous).into_response());
    };

    let token_hash = hash_nonce(&payload.nonce);
    let Some(session) = state.store.find_by_token_hash(&token_hash).await? else {
        return Ok(Json(anonymous).into_response());
    };

    let queue_position = if session.status == SessionStatus::Queued {
        state.occupancy.queue_position(session.id).await?
    } else {
        None
    };

    Ok(Json(StatusResponse {
        occupancy,
        your_status: Some(session.status),
        queue_position,
        is_admin: Some(session.is_admin),
    })
    .into_response())
}
