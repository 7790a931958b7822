//! Request handlers for the browser pages.

mod home;
mod storage;

pub use home::*;
pub use storage::*;

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cancellation token that fires once a request's deadline passes.
pub struct RequestDeadline {
    token: CancellationToken,
    timer: JoinHandle<()>,
}

impl RequestDeadline {
    /// Starts the deadline timer.
    pub fn start(timeout: Duration) -> Self {
        let token = CancellationToken::new();
        let expire = token.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            expire.cancel();
        });
        Self { token, timer }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for RequestDeadline {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deadline_cancels() {
        let deadline = RequestDeadline::start(Duration::from_millis(10));
        tokio::time::timeout(Duration::from_secs(5), deadline.token().cancelled())
            .await
            .unwrap();
        assert!(deadline.token().is_cancelled());
    }

    #[tokio::test]
    async fn test_deadline_dropped_early() {
        let deadline = RequestDeadline::start(Duration::from_secs(60));
        let token = deadline.token().clone();
        drop(deadline);
        assert!(!token.is_cancelled());
    }
}
