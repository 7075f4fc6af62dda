//! Per-operation context: deadline and cancellation.

use crate::error::{SessionError, SessionResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Caller-supplied context passed through to every database call.
///
/// A context is cloned into each store it creates, so database calls made by
/// [`save`](crate::SessionStore::save) observe the same deadline and
/// cancellation as the request that loaded the session.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    deadline: Option<Instant>,
    cancellation: Option<CancellationToken>,
}

impl SessionContext {
    /// A context with no deadline and no cancellation.
    pub fn background() -> Self {
        Self::default()
    }

    /// Fail database calls that have not completed within `timeout` from now.
    ///
    /// A timeout too large to represent as an instant leaves the deadline
    /// unset.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Fail database calls that have not completed by `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Abort database calls when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the cancellation token has fired.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Run a database call under this context.
    pub async fn run<F, T>(&self, fut: F) -> SessionResult<T>
    where
        F: Future<Output = SessionResult<T>>,
    {
        if self.is_cancelled() {
            return Err(SessionError::Cancelled);
        }

        let bounded = async {
            match self.deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, fut).await {
                    Ok(result) => result,
                    Err(_) => Err(SessionError::Timeout),
                },
                None => fut.await,
            }
        };

        match &self.cancellation {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(SessionError::Cancelled),
                result = bounded => result,
            },
            None => bounded.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_background_runs_to_completion() {
        let ctx = SessionContext::background();
        assert!(ctx.deadline().is_none());

        let value = ctx.run(async { Ok::<_, SessionError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_errors_pass_through() {
        let ctx = SessionContext::background();
        let err = ctx
            .run(async { Err::<(), _>(SessionError::NotFound("abc".into())) })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_elapses() {
        let ctx = SessionContext::background().with_timeout(Duration::from_millis(50));

        let err = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, SessionError>(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::Timeout));
    }

    #[tokio::test]
    async fn test_unbounded_timeout_has_no_deadline() {
        let ctx = SessionContext::background().with_timeout(Duration::MAX);
        assert!(ctx.deadline().is_none());

        let value = ctx.run(async { Ok::<_, SessionError>("done") }).await.unwrap();
        assert_eq!(value, "done");
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();

        let ctx = SessionContext::background().with_cancellation(token);
        assert!(ctx.is_cancelled());

        let err = ctx.run(async { Ok::<_, SessionError>(()) }).await.unwrap_err();
        assert!(matches!(err, SessionError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_while_running() {
        let token = CancellationToken::new();
        let ctx = SessionContext::background().with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        let err = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, SessionError>(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::Cancelled));
        canceller.await.unwrap();
    }
}
