//! Delivers CloudEvents to the sink.
use super::transform::CloudEvent;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use url::Url;

/// Media type of a CloudEvent in structured mode.
pub const CLOUDEVENTS_JSON: &str = "application/cloudevents+json";

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("sink responded with status {status}")]
    Rejected { status: u16 },
    #[error("unable to reach sink: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unable to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

impl DeliveryError {
    /// The response status, when the sink answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            DeliveryError::Rejected { status } => Some(*status),
            DeliveryError::Transport(err) => err.status().map(|status| status.as_u16()),
            DeliveryError::Encode(_) => None,
        }
    }
}

#[async_trait]
pub trait EventSender: Send + Sync {
    /// Sends one event, returning the status code of an accepting response.
    async fn send(&self, event: &CloudEvent) -> Result<u16, DeliveryError>;
}

/// Posts events to the sink over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSender {
    client: reqwest::Client,
    sink: Url,
}

impl HttpSender {
    pub fn new(sink: Url) -> Self {
        Self::with_client(reqwest::Client::new(), sink)
    }

    pub fn with_client(client: reqwest::Client, sink: Url) -> Self {
        HttpSender { client, sink }
    }

    pub fn sink(&self) -> &Url {
        &self.sink
    }
}

#[async_trait]
impl EventSender for HttpSender {
    async fn send(&self, event: &CloudEvent) -> Result<u16, DeliveryError> {
        let body = serde_json::to_vec(event)?;
        let response = self.client
            .post(self.sink.clone())
            .header(CONTENT_TYPE, CLOUDEVENTS_JSON)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(status.as_u16())
        } else {
            Err(DeliveryError::Rejected { status: status.as_u16() })
        }
    }
}
