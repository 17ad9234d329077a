use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

#[derive(Debug)]
struct Window {
    start: Instant,
    count: u32,
}

/// Fixed one-second window limiter, one per router surface (public vs jury).
#[derive(Clone, Debug)]
pub struct RateLimiter {
    rps: u32,
    window: Arc<Mutex<Window>>,
}

impl RateLimiter {
    pub fn new(rps: u32) -> Self {
        Self {
            rps: rps.max(1),
            window: Arc::new(Mutex::new(Window {
                start: Instant::now(),
                count: 0,
            })),
        }
    }

    fn allow(&self) -> bool {
        let mut guard = self.window.lock().expect("rate limiter mutex poisoned");
        let now = Instant::now();
        if now.duration_since(guard.start) >= Duration::from_secs(1) {
            guard.start = now;
            guard.count = 0;
        }
        if guard.count < self.rps {
            guard.count += 1;
            true
        } else {
            false
        }
    }
}

pub async fn rps_middleware(
    State(limiter): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !limiter.allow() {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "success": false, "message": "Too many requests" })),
        )
            .into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_caps_at_configured_rps() {
        let limiter = RateLimiter::new(3);
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(!limiter.allow());
    }

    #[test]
    fn zero_rps_is_clamped_to_one() {
        let limiter = RateLimiter::new(0);
        assert!(limiter.allow());
        assert!(!limiter.allow());
    }
}
