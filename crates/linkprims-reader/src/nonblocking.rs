//! Collection from async contexts.
//!
//! The worker stays on its own thread; only the controller side changes.
//! Polls sleep on the tokio timer instead of blocking the runtime thread.

use std::time::Duration;

use tracing::warn;

use crate::collect::{Collected, Collection};
use crate::config::CollectRequest;
use crate::error::Result;
use crate::reader::LinkReader;

impl LinkReader {
    /// Async counterpart of [`collect`](LinkReader::collect).
    pub async fn collect_async(&mut self, request: &CollectRequest) -> Result<Collected> {
        request.validate()?;
        let collected = {
            let (shared, poll_interval, last_returned) = self.parts();
            let mut collection = Collection::begin(shared, request, poll_interval, last_returned);
            let reason = loop {
                if let Some(reason) = collection.poll() {
                    break reason;
                }
                tokio::time::sleep(collection.next_wait()).await;
            };
            collection.finish(reason)
        };
        self.set_last_returned(collected.len());
        Ok(collected)
    }

    /// Async counterpart of [`wait_stopped`](LinkReader::wait_stopped).
    pub async fn wait_stopped_async(&self, max_wait: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + max_wait;
        let mut ticker = tokio::time::interval(self.config().stop_poll_interval);
        loop {
            ticker.tick().await;
            if self.is_stopped() {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                warn!(
                    link = self.link().name(),
                    ?max_wait,
                    "reader worker not confirmed stopped"
                );
                return false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use linkprims_link::{LoopbackConfig, LoopbackLink};

    use super::*;
    use crate::collect::StopReason;

    #[tokio::test]
    async fn collect_async_stops_on_delimiter() {
        let link = Arc::new(LoopbackLink::with_config(
            "dev0",
            LoopbackConfig {
                echo: false,
                ..LoopbackConfig::default()
            },
        ));
        let mut reader = LinkReader::spawn(link.clone()).unwrap();
        link.inject(b"OK\r\nmore");

        let got = reader
            .collect_async(
                &CollectRequest::default()
                    .with_timeout(Duration::from_secs(5))
                    .with_delimiter(b'\n'),
            )
            .await
            .unwrap();
        assert_eq!(got.reason, StopReason::Delimiter);
        assert!(got.bytes.starts_with(b"OK\r\n"));
    }

    #[tokio::test]
    async fn collect_async_times_out_empty() {
        let link = Arc::new(LoopbackLink::new("dev0"));
        let mut reader = LinkReader::spawn(link).unwrap();

        let got = reader
            .collect_async(&CollectRequest::default().with_timeout(Duration::from_millis(50)))
            .await
            .unwrap();
        assert_eq!(got.reason, StopReason::Timeout);
        assert!(got.is_empty());
        assert!(got.elapsed >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn wait_stopped_async_observes_stop() {
        let link = Arc::new(LoopbackLink::new("dev0"));
        let reader = LinkReader::spawn(link).unwrap();
        reader.request_stop();
        assert!(reader.wait_stopped_async(Duration::from_secs(1)).await);
    }
}
