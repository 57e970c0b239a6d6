//! Bearer-key authentication and per-client rate limiting.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::{
    collections::{HashMap, VecDeque},
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

const DEFAULT_RATE_LIMIT: u32 = 100;
const RATE_WINDOW: Duration = Duration::from_secs(60);
const MAX_TRACKED_CLIENTS: usize = 10_000;

/// Security settings applied by `create_router_with_config`.
#[derive(Clone, Debug)]
pub struct SecurityConfig {
    /// Required bearer token; `None` leaves the API open.
    pub api_key: Option<String>,
    /// Allowed CORS origins; `None` is permissive.
    pub cors_origins: Option<Vec<String>>,
    pub rate_limiter: Option<RateLimiter>,
}

impl SecurityConfig {
    /// Reads `BLOOMWELL_API_KEY`, `BLOOMWELL_CORS_ORIGINS`,
    /// `BLOOMWELL_RATE_LIMIT` and `BLOOMWELL_TRUST_PROXY` through `lookup`.
    ///
    /// Rate limiting is switched on only together with an API key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_key = lookup("BLOOMWELL_API_KEY").filter(|k| !k.is_empty());

        let cors_origins = lookup("BLOOMWELL_CORS_ORIGINS").map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect()
        });

        let per_minute = match lookup("BLOOMWELL_RATE_LIMIT") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!("Ignoring invalid BLOOMWELL_RATE_LIMIT {:?}", raw);
                DEFAULT_RATE_LIMIT
            }),
            None => DEFAULT_RATE_LIMIT,
        };
        let trust_proxy = lookup("BLOOMWELL_TRUST_PROXY")
            .is_some_and(|v| matches!(v.trim(), "1" | "true" | "yes"));

        let rate_limiter = api_key.as_ref().map(|_| {
            let limiter = RateLimiter::new(per_minute, RATE_WINDOW);
            if trust_proxy {
                limiter.trusting_forwarded_headers()
            } else {
                limiter
            }
        });

        Self {
            api_key,
            cors_origins,
            rate_limiter,
        }
    }

    /// No authentication, permissive CORS, no rate limiting.
    pub fn disabled() -> Self {
        Self {
            api_key: None,
            cors_origins: None,
            rate_limiter: None,
        }
    }

    pub fn with_api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
            ..Self::disabled()
        }
    }

    pub fn with_cors_origins(origins: Vec<String>) -> Self {
        Self {
            cors_origins: Some(origins),
            ..Self::disabled()
        }
    }

    /// Rate limiting alone, `per_minute` requests per client.
    pub fn with_rate_limit(per_minute: u32) -> Self {
        Self {
            rate_limiter: Some(RateLimiter::new(per_minute, RATE_WINDOW)),
            ..Self::disabled()
        }
    }
}

/// Where a request's client address is read from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClientAddress {
    /// The TCP peer of the connection.
    #[default]
    Peer,
    /// The first `X-Forwarded-For` hop, then `X-Real-IP`, then the peer.
    /// Only sound behind a reverse proxy that overwrites those headers.
    Forwarded,
}

/// Sliding-window request counter per client address.
///
/// The table holds at most `max_clients` addresses. Expired addresses are
/// dropped by [`RateLimiter::prune`], which runs on a timer while serving and
/// whenever the table fills up. A new address arriving while the table is
/// full of active clients is refused.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    max_clients: usize,
    source: ClientAddress,
    hits: Arc<Mutex<HashMap<IpAddr, VecDeque<Instant>>>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit: limit as usize,
            window,
            max_clients: MAX_TRACKED_CLIENTS,
            source: ClientAddress::Peer,
            hits: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Keys clients on proxy headers instead of the peer address.
    pub fn trusting_forwarded_headers(mut self) -> Self {
        self.source = ClientAddress::Forwarded;
        self
    }

    pub fn client_address(&self) -> ClientAddress {
        self.source
    }

    /// Counts a request from `ip` and reports whether it is allowed.
    pub fn check(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut hits = self.hits.lock().unwrap_or_else(|e| e.into_inner());

        if !hits.contains_key(&ip) && hits.len() >= self.max_clients {
            Self::drop_expired(&mut hits, now, self.window);
            if hits.len() >= self.max_clients {
                tracing::warn!("Rate limiter table full, refusing new client {}", ip);
                return false;
            }
        }

        let times = hits.entry(ip).or_default();
        while times
            .front()
            .is_some_and(|&t| now.duration_since(t) >= self.window)
        {
            times.pop_front();
        }

        if times.len() < self.limit {
            times.push_back(now);
            true
        } else {
            false
        }
    }

    /// Forgets clients with no requests inside the current window.
    pub fn prune(&self) {
        let mut hits = self.hits.lock().unwrap_or_else(|e| e.into_inner());
        Self::drop_expired(&mut hits, Instant::now(), self.window);
    }

    /// Prunes once per window for as long as the runtime lives.
    pub fn spawn_pruning(&self) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(limiter.window);
            loop {
                ticks.tick().await;
                limiter.prune();
            }
        })
    }

    fn drop_expired(
        hits: &mut HashMap<IpAddr, VecDeque<Instant>>,
        now: Instant,
        window: Duration,
    ) {
        hits.retain(|_, times| {
            times.back().is_some_and(|&t| now.duration_since(t) < window)
        });
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.hits.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, &'static str> {
    let value = headers
        .get("Authorization")
        .ok_or("missing Authorization header")?
        .to_str()
        .map_err(|_| "unreadable Authorization header")?;
    value
        .strip_prefix("Bearer ")
        .ok_or("Authorization header is not a bearer token")
}

/// Lets a request through only with `Authorization: Bearer <api_key>`.
pub async fn auth_middleware(
    State(config): State<SecurityConfig>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = config.api_key.as_deref() else {
        return Ok(next.run(request).await);
    };

    match bearer_token(request.headers()) {
        Ok(token) if token == expected => Ok(next.run(request).await),
        Ok(_) => {
            tracing::warn!("Rejected request with a wrong API key");
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(reason) => {
            tracing::warn!("Rejected request: {}", reason);
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let ip = client_ip(&request, limiter.client_address());

    if limiter.check(ip) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!("Rate limit exceeded for {}", ip);
        Err(StatusCode::TOO_MANY_REQUESTS)
    }
}

/// The address a request is counted against.
///
/// Without connection info (in-process test servers) the peer is taken to
/// be localhost.
fn client_ip(request: &Request<Body>, source: ClientAddress) -> IpAddr {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));

    match source {
        ClientAddress::Peer => peer,
        ClientAddress::Forwarded => {
            let header = |name: &str| request.headers().get(name).and_then(|v| v.to_str().ok());
            header("X-Forwarded-For")
                .and_then(|v| v.split(',').next())
                .and_then(|ip| ip.trim().parse().ok())
                .or_else(|| header("X-Real-IP").and_then(|v| v.trim().parse().ok()))
                .unwrap_or(peer)
        }
    }
}
