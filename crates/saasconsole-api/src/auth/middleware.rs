use crate::auth::jwt::JwtService;
use crate::auth::models::SessionContext;
use crate::error::HttpAppError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use saasconsole_core::models::Status;
use saasconsole_core::AppError;
use saasconsole_db::UserRepository;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Counts failed authentications per client and blocks a client once it
/// reaches the limit, until its window expires.
#[derive(Clone)]
pub struct AuthFailureLimiter {
    inner: Arc<Mutex<HashMap<String, (u32, Instant)>>>,
    max_failures: u32,
    window: Duration,
}

impl AuthFailureLimiter {
    pub fn new(max_failures: u32, window_seconds: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            max_failures,
            window: Duration::from_secs(window_seconds),
        }
    }

    /// Record a failure; true when the client is now blocked.
    pub async fn record_failure(&self, ip: &str) -> bool {
        let mut guard = self.inner.lock().await;
        let now = Instant::now();
        let (count, reset_at) = guard.entry(ip.to_string()).or_insert((0, now + self.window));
        if now >= *reset_at {
            *count = 0;
            *reset_at = now + self.window;
        }
        *count += 1;
        *count >= self.max_failures
    }

    pub async fn is_blocked(&self, ip: &str) -> bool {
        let mut guard = self.inner.lock().await;
        if let Some((count, reset_at)) = guard.get(ip) {
            if Instant::now() >= *reset_at {
                guard.remove(ip);
                return false;
            }
            return *count >= self.max_failures;
        }
        false
    }
}

#[derive(Clone)]
pub struct AuthState {
    pub jwt: JwtService,
    pub users: UserRepository,
    pub auth_failure_limiter: Option<Arc<AuthFailureLimiter>>,
}

/// Client address: first `X-Forwarded-For` hop, then `X-Real-IP`, then the socket.
fn client_ip(headers: &HeaderMap, socket_addr: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| ip.parse::<std::net::IpAddr>().is_ok());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|ip| ip.parse::<std::net::IpAddr>().is_ok());
    if let Some(ip) = real_ip {
        return ip.to_string();
    }

    socket_addr
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::MissingAuthorizationHeader)?;
    match header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AppError::InvalidTokenFormat),
    }
}

async fn authenticate(auth_state: &AuthState, headers: &HeaderMap) -> Result<SessionContext, AppError> {
    let token = bearer_token(headers)?;
    let claims = auth_state.jwt.validate(token)?;

    let user = auth_state
        .users
        .get(claims.sub)
        .await?
        .ok_or_else(|| AppError::InvalidToken("Unknown user".to_string()))?;
    if user.status == Status::Deleted {
        return Err(AppError::InvalidToken("User is deleted".to_string()));
    }

    let company_id = user.active_company.or(claims.company_id);
    Ok(SessionContext { user, company_id })
}

pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let socket_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let ip = client_ip(request.headers(), socket_addr);

    if let Some(ref limiter) = auth_state.auth_failure_limiter {
        if limiter.is_blocked(&ip).await {
            return (StatusCode::TOO_MANY_REQUESTS, "Too many failed auth attempts").into_response();
        }
    }

    match authenticate(&auth_state, request.headers()).await {
        Ok(context) => {
            tracing::debug!(user_id = %context.user_id(), company_id = ?context.company_id, "Authenticated");
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        // A store outage is not the client's fault
        Err(err @ (AppError::Store(_) | AppError::Internal(_))) => HttpAppError(err).into_response(),
        Err(err) => {
            tracing::info!(client_ip = %ip, reason = %err, "Authentication failed");
            if let Some(ref limiter) = auth_state.auth_failure_limiter {
                if limiter.record_failure(&ip).await {
                    return (StatusCode::TOO_MANY_REQUESTS, "Too many failed auth attempts")
                        .into_response();
                }
            }
            HttpAppError(err).into_response()
        }
    }
}
