//! Fixed-window per-IP rate limiting for public routes (§6 "Rate limiting"):
//! 60 requests/minute/IP, admin routes exempt (they're already gated by the
//! bearer token and are meant for trusted ingestion clients).

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::extract::Request;
use axum::response::Response;

const WINDOW: Duration = Duration::from_secs(60);
const LIMIT: u32 = 60;

struct Window {
    count: u32,
    started_at: Instant,
}

/// Shared fixed-window counters, one per client IP.
#[derive(Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<IpAddr, Window>>,
}

impl RateLimiter {
    /// Build an empty limiter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn check(&self, ip: IpAddr) -> bool {
        let mut windows = self.windows.lock().expect("rate limiter mutex poisoned");
        let now = Instant::now();
        let entry = windows.entry(ip).or_insert_with(|| Window { count: 0, started_at: now });
        if now.duration_since(entry.started_at) > WINDOW {
            entry.count = 0;
            entry.started_at = now;
        }
        entry.count += 1;
        entry.count <= LIMIT
    }
}

/// Axum middleware enforcing [`RateLimiter`] against the connecting IP.
pub async fn enforce(
    State(limiter): State<std::sync::Arc<RateLimiter>>,
    ConnectInfo(addr): ConnectInfo<std::net::SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if limiter.check(addr.ip()) {
        Ok(next.run(req).await)
    } else {
        Err(StatusCode::TOO_MANY_REQUESTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn allows_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new();
        let ip = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));
        for _ in 0..LIMIT {
            assert!(limiter.check(ip));
        }
        assert!(!limiter.check(ip));
    }

    #[test]
    fn different_ips_have_independent_windows() {
        let limiter = RateLimiter::new();
        let a = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let b = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));
        for _ in 0..LIMIT {
            assert!(limiter.check(a));
        }
        assert!(limiter.check(b));
    }
}
