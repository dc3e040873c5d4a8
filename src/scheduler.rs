//! Polling Scheduler — spec §4.3.
//!
//! One loop per polling provider: no retry, no backoff beyond the
//! configured interval; errors in a tick are logged and never block the
//! next tick.

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Implemented by a polling-shaped concrete provider (spec §4.2).
#[async_trait]
pub trait Poll: Send + Sync {
    async fn poll(&self) -> crate::error::Result<()>;
}

/// Runs `provider.poll()` every `interval` until `cancellation` fires.
/// Mirrors the teacher's bare `while !ctx.cancelled { ... }` scheduling
/// loops (see the reconnect loops in `src/cex/okx/mod.rs` and
/// `src/cex/binance/mod.rs`), generalized to any [`Poll`] implementor.
pub async fn run_polling_loop<P: Poll + ?Sized>(
    provider: &P,
    interval: Duration,
    cancellation: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancellation.cancelled() => {
                log::info!("polling loop cancelled");
                return;
            }
            result = provider.poll() => {
                if let Err(err) = result {
                    log::warn!("poll tick failed: {err}");
                }
            }
        }

        tokio::select! {
            _ = cancellation.cancelled() => {
                log::info!("polling loop cancelled");
                return;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counter(Arc<AtomicUsize>);

    #[async_trait]
    impl Poll for Counter {
        async fn poll(&self) -> crate::error::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn stops_on_cancellation() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Counter(count.clone());
        let token = CancellationToken::new();
        let token2 = token.clone();

        let handle = tokio::spawn(async move {
            run_polling_loop(&counter, Duration::from_millis(5), token2).await;
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        token.cancel();
        handle.await.unwrap();

        assert!(count.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn tick_error_does_not_stop_loop() {
        struct Failing(Arc<AtomicUsize>);
        #[async_trait]
        impl Poll for Failing {
            async fn poll(&self) -> crate::error::Result<()> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Err(crate::error::ProviderError::Transport("boom".into()))
            }
        }

        let count = Arc::new(AtomicUsize::new(0));
        let failing = Failing(count.clone());
        let token = CancellationToken::new();
        let token2 = token.clone();

        let handle = tokio::spawn(async move {
            run_polling_loop(&failing, Duration::from_millis(5), token2).await;
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        token.cancel();
        handle.await.unwrap();

        assert!(count.load(Ordering::SeqCst) >= 2);
    }
}
