//! HTTP client for the display device.

use async_trait::async_trait;
use reqwest::Client;

use super::payload::{NotifyPayload, parse_screen};
use super::{DeviceError, FrameSink};
use crate::container::Frame;
use crate::schema::{DeviceHost, StreamConfig};

const NOTIFY_PATH: &str = "/api/notify";
const SCREEN_PATH: &str = "/api/screen";
const PREVIOUS_APP_PATH: &str = "/api/previousapp";
const NEXT_APP_PATH: &str = "/api/nextapp";

/// Client for one device. Cheap to clone; clones share a connection pool.
#[derive(Debug, Clone)]
pub struct DeviceClient {
    http: Client,
    host: DeviceHost,
}

impl DeviceClient {
    pub fn new(host: DeviceHost, config: &StreamConfig) -> Result<Self, DeviceError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { http, host })
    }

    pub fn host(&self) -> &DeviceHost {
        &self.host
    }

    /// Draw `frame` on the device.
    pub async fn push(&self, frame: &Frame) -> Result<(), DeviceError> {
        self.http
            .post(self.host.endpoint(NOTIFY_PATH))
            .json(&NotifyPayload::for_frame(frame))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Read what the device currently shows.
    pub async fn pull(&self) -> Result<Frame, DeviceError> {
        let body = self
            .http
            .get(self.host.endpoint(SCREEN_PATH))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_screen(&body)
    }

    /// Switch the device to its previous app.
    pub async fn previous_app(&self) -> Result<(), DeviceError> {
        self.post_empty(PREVIOUS_APP_PATH).await
    }

    /// Switch the device to its next app.
    pub async fn next_app(&self) -> Result<(), DeviceError> {
        self.post_empty(NEXT_APP_PATH).await
    }

    async fn post_empty(&self, path: &str) -> Result<(), DeviceError> {
        self.http
            .post(self.host.endpoint(path))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl FrameSink for DeviceClient {
    async fn push(&self, frame: &Frame) -> Result<(), DeviceError> {
        DeviceClient::push(self, frame).await
    }
}
