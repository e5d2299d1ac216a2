//! Network side of playback: pushing frames to the LED clock and reading
//! back what it shows.
//!
//! Pushes are fire-and-forget from the player's point of view. A failed
//! push is reported to the caller, which logs it; nothing is retried.

mod client;
mod payload;

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

pub use client::DeviceClient;
pub use payload::{NotifyPayload, parse_screen};

use crate::container::Frame;
use crate::playback::SingleFlight;

/// Errors talking to the device.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Device request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed screen response: {reason}")]
    MalformedScreen { reason: String },
}

/// Destination for frames during playback.
#[async_trait]
pub trait FrameSink: Send + Sync {
    async fn push(&self, frame: &Frame) -> Result<(), DeviceError>;
}

/// Mirror the device screen into `tx` until every receiver is dropped.
///
/// A failed pull skips that cycle; the previous frame stays published.
pub async fn mirror(client: DeviceClient, poll_interval: Duration, tx: watch::Sender<Frame>) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    while !tx.is_closed() {
        ticker.tick().await;
        match client.pull().await {
            Ok(frame) => {
                tx.send_replace(frame);
            }
            Err(e) => log::warn!("Skipping screen refresh from {}: {}", client.host(), e),
        }
    }
    log::debug!("Screen mirror for {} stopped", client.host());
}

/// Previous/next app requests, at most one in flight.
///
/// Key repeats while a switch is pending are dropped rather than stacked.
#[derive(Debug, Clone)]
pub struct AppSwitcher {
    client: DeviceClient,
    gate: SingleFlight,
}

impl AppSwitcher {
    pub fn new(client: DeviceClient) -> Self {
        Self {
            client,
            gate: SingleFlight::new(),
        }
    }

    /// Request the previous app. Returns false when a switch is pending.
    pub fn previous(&self) -> bool {
        let client = self.client.clone();
        self.dispatch("previous", async move { client.previous_app().await })
    }

    /// Request the next app. Returns false when a switch is pending.
    pub fn next(&self) -> bool {
        let client = self.client.clone();
        self.dispatch("next", async move { client.next_app().await })
    }

    fn dispatch<F>(&self, direction: &'static str, request: F) -> bool
    where
        F: Future<Output = Result<(), DeviceError>> + Send + 'static,
    {
        self.gate
            .try_spawn(async move {
                if let Err(e) = request.await {
                    log::warn!("Switching to {} app failed: {}", direction, e);
                }
            })
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DeviceHost, StreamConfig};

    fn client() -> DeviceClient {
        let config = StreamConfig {
            request_timeout_ms: 200,
            ..Default::default()
        };
        DeviceClient::new(DeviceHost::parse("http://127.0.0.1:9").unwrap(), &config).unwrap()
    }

    #[tokio::test]
    async fn test_app_switch_drops_while_pending() {
        let switcher = AppSwitcher::new(client());
        assert!(switcher.next());
        // The first request has not had a chance to complete yet
        assert!(!switcher.previous());
    }

    #[tokio::test]
    async fn test_mirror_keeps_last_frame_on_error() {
        let (tx, rx) = watch::channel(Frame::black());
        let task = tokio::spawn(mirror(client(), Duration::from_millis(10), tx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*rx.borrow(), Frame::black());

        drop(rx);
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("mirror should stop once receivers are gone")
            .unwrap();
    }
}
