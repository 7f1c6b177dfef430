//! non-blocking http transport built on [`reqwest`]
use std::time::{Duration, Instant};

use tracing::{error, instrument, trace};
use url::Url;

use crate::error::StrikeFuzzError;
use crate::template::ResolvedRequest;

/// a completed exchange as reported by the transport: status, body, timing
#[derive(Clone, Debug)]
pub struct RawResponse {
    /// http status code
    pub status_code: u16,

    /// fully read response body
    pub body: Vec<u8>,

    /// round-trip time, including the body read
    pub elapsed: Duration,
}

/// thin wrapper around a shared [`reqwest::Client`]
///
/// the client is cheap to clone (internally reference counted), so each
/// in-flight request carries its own handle without duplicating connection
/// pools
#[derive(Clone, Debug)]
pub struct Transport {
    client: reqwest::Client,
}

impl Transport {
    /// build the transport multiplexer with an optional per-request timeout
    ///
    /// # Errors
    ///
    /// a failure here is fatal; the engine cannot make any progress without
    /// a transport
    pub fn new(timeout: Option<Duration>) -> Result<Self, StrikeFuzzError> {
        let mut builder = reqwest::Client::builder();

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|source| {
            error!("could not build the http transport: {}", source);
            StrikeFuzzError::TransportBuildError { source }
        })?;

        Ok(Self { client })
    }

    /// send one resolved request and read its response to completion
    ///
    /// a request with a body is sent as a POST form submission, otherwise a
    /// plain GET; the template's headers are applied on top
    ///
    /// # Errors
    ///
    /// connection, timeout, tls, and malformed-url failures all surface
    /// here; the engine records them as transport errors rather than
    /// aborting the run
    #[instrument(skip_all, level = "trace")]
    pub async fn send(&self, request: &ResolvedRequest) -> Result<RawResponse, StrikeFuzzError> {
        let url = Url::parse(&request.url).map_err(|source| {
            error!(url = %request.url, "instantiated url failed to parse");
            StrikeFuzzError::InvalidUrl {
                source,
                url: request.url.clone(),
            }
        })?;

        let mut builder = if let Some(body) = &request.body {
            self.client
                .post(url)
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(body.clone())
        } else {
            self.client.get(url)
        };

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let started = Instant::now();

        let response = builder.send().await?;
        let status_code = response.status().as_u16();
        let body = response.bytes().await?;

        let elapsed = started.elapsed();

        trace!(status = status_code, bytes = body.len(), "request completed");

        Ok(RawResponse {
            status_code,
            body: body.to_vec(),
            elapsed,
        })
    }
}
