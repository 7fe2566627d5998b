use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{ResourceFetcher, RiskPayload, RiskRequest};
use crate::{
    config::ClientConfig,
    prelude::*,
    req::{HttpClient, TokenSource},
    types::{
        sort_history, RiskBenchmark, RiskHistoryPoint, RiskHistoryResponse, RiskMitigation,
        RiskScore, SubjectId,
    },
    BaseUrl, Error,
};

/// HTTP method and path prefix for a request; the subject id is appended as the last segment.
pub(crate) fn request_route(request: &RiskRequest) -> (Method, [&'static str; 3]) {
    match request {
        RiskRequest::Score {
            force_recalculate: false,
        } => (Method::GET, ["api", "risk", "calculate"]),
        RiskRequest::Score {
            force_recalculate: true,
        } => (Method::POST, ["api", "risk", "recalculate"]),
        RiskRequest::History { .. } => (Method::GET, ["api", "risk", "history"]),
        RiskRequest::Benchmark => (Method::GET, ["api", "risk", "benchmark"]),
        RiskRequest::Mitigations => (Method::GET, ["api", "risk", "mitigations"]),
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| Error::malformed(format!("invalid payload: {e}")))
}

/// Decode and validate a response body for `request`.
///
/// Anything that does not match the schema becomes a `server` error so bad
/// data never reaches a slot.
pub(crate) fn decode_payload(request: &RiskRequest, body: &str) -> Result<RiskPayload> {
    match request {
        RiskRequest::Score { .. } => {
            let score: RiskScore = decode(body)?;
            score.validate().map_err(Error::malformed)?;
            Ok(RiskPayload::Score(score))
        }
        RiskRequest::History { .. } => {
            let response: RiskHistoryResponse = decode(body)?;
            let mut points = response.history;
            for point in &points {
                point.validate().map_err(Error::malformed)?;
            }
            sort_history(&mut points);
            Ok(RiskPayload::History(points))
        }
        RiskRequest::Benchmark => {
            let benchmark: RiskBenchmark = decode(body)?;
            benchmark.validate().map_err(Error::malformed)?;
            Ok(RiskPayload::Benchmark(benchmark))
        }
        RiskRequest::Mitigations => {
            let mitigations: Option<Vec<RiskMitigation>> = decode(body)?;
            let mitigations = mitigations.unwrap_or_default();
            for m in &mitigations {
                m.validate().map_err(Error::malformed)?;
            }
            Ok(RiskPayload::Mitigations(mitigations))
        }
    }
}

/// REST client for the four risk resources.
#[derive(Debug)]
pub struct RiskClient {
    pub http_client: HttpClient,
}

impl RiskClient {
    pub fn new(client: Option<Client>, base_url: Option<BaseUrl>) -> RiskClient {
        let client = client.unwrap_or_default();
        let base_url = base_url.unwrap_or(BaseUrl::Production).get_url();

        RiskClient {
            http_client: HttpClient {
                client,
                base_url,
                token_source: None,
            },
        }
    }

    /// Build a client with the configured timeout and user agent.
    pub fn from_config(config: &ClientConfig) -> Result<RiskClient> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::network(format!("failed to build http client: {e}")))?;
        Ok(Self::new(Some(client), Some(config.base_url())))
    }

    /// Attach a bearer token to every request made by this client.
    pub fn with_token_source(mut self, source: Arc<dyn TokenSource>) -> Self {
        self.http_client.token_source = Some(source);
        self
    }

    async fn send_risk_request(
        &self,
        subject: &SubjectId,
        request: RiskRequest,
    ) -> Result<RiskPayload> {
        let (method, prefix) = request_route(&request);
        let mut segments: Vec<&str> = prefix.to_vec();
        segments.push(subject.as_str());
        let url = self.http_client.endpoint(&segments)?;

        let body = if method == Method::POST {
            self.http_client.post(url).await
        } else {
            let query = match request {
                RiskRequest::History { window_days } => vec![("days", window_days.to_string())],
                _ => Vec::new(),
            };
            self.http_client.get(url, &query).await
        };

        let body = body.map_err(|e| {
            debug!(
                target: "supplier_risk_sdk::fetcher",
                subject = %subject,
                kind = %request.kind(),
                error = %e,
                "Risk request failed"
            );
            e
        })?;

        decode_payload(&request, &body).map_err(|e| {
            warn!(
                target: "supplier_risk_sdk::fetcher",
                subject = %subject,
                kind = %request.kind(),
                error = %e,
                "Rejected malformed risk payload"
            );
            e
        })
    }

    /// Get the current score, computing it server-side when absent.
    ///
    /// With `force_recalculate` the recompute endpoint is used instead.
    pub async fn risk_score(&self, subject: &SubjectId, force_recalculate: bool) -> Result<RiskScore> {
        match self
            .send_risk_request(subject, RiskRequest::Score { force_recalculate })
            .await?
        {
            RiskPayload::Score(score) => Ok(score),
            other => Err(unexpected(other)),
        }
    }

    /// Get the score history for the last `window_days`, ascending by date.
    pub async fn risk_history(
        &self,
        subject: &SubjectId,
        window_days: u32,
    ) -> Result<Vec<RiskHistoryPoint>> {
        match self
            .send_risk_request(subject, RiskRequest::History { window_days })
            .await?
        {
            RiskPayload::History(points) => Ok(points),
            other => Err(unexpected(other)),
        }
    }

    pub async fn risk_benchmark(&self, subject: &SubjectId) -> Result<RiskBenchmark> {
        match self.send_risk_request(subject, RiskRequest::Benchmark).await? {
            RiskPayload::Benchmark(benchmark) => Ok(benchmark),
            other => Err(unexpected(other)),
        }
    }

    pub async fn risk_mitigations(&self, subject: &SubjectId) -> Result<Vec<RiskMitigation>> {
        match self.send_risk_request(subject, RiskRequest::Mitigations).await? {
            RiskPayload::Mitigations(mitigations) => Ok(mitigations),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(payload: RiskPayload) -> Error {
    Error::malformed(format!("unexpected {} payload", payload.kind()))
}

#[async_trait]
impl ResourceFetcher for RiskClient {
    async fn fetch(&self, subject: &SubjectId, request: RiskRequest) -> Result<RiskPayload> {
        self.send_risk_request(subject, request).await
    }
}
