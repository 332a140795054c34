//! Reqwest-backed client for the randomuser.me API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{CandidateUser, UpstreamError, UserSource};

/// Default public endpoint.
pub const DEFAULT_BASE_URL: &str = "https://randomuser.me";

/// HTTP client for the random-user generator.
#[derive(Debug, Clone)]
pub struct RandomUserClient {
    client: Client,
    base_url: String,
}

impl RandomUserClient {
    /// Build a client with an explicit per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/", self.base_url)
    }
}

#[async_trait]
impl UserSource for RandomUserClient {
    async fn fetch_users(&self, count: usize) -> Result<Vec<CandidateUser>, UpstreamError> {
        tracing::debug!(count, url = %self.endpoint(), "fetching random users");

        let response = self
            .client
            .get(self.endpoint())
            .query(&[("results", count.to_string())])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        parse_users(&body, count)
    }
}

#[derive(Debug, Deserialize)]
struct ResultsDto {
    results: Vec<PersonDto>,
}

#[derive(Debug, Deserialize)]
struct PersonDto {
    name: NameDto,
    email: String,
    dob: DobDto,
}

#[derive(Debug, Deserialize)]
struct NameDto {
    first: String,
    last: String,
}

#[derive(Debug, Deserialize)]
struct DobDto {
    age: u32,
}

fn parse_users(body: &[u8], expected: usize) -> Result<Vec<CandidateUser>, UpstreamError> {
    let decoded: ResultsDto =
        serde_json::from_slice(body).map_err(|e| UpstreamError::Decode(e.to_string()))?;

    if decoded.results.len() < expected {
        return Err(UpstreamError::ShortResult {
            expected,
            received: decoded.results.len(),
        });
    }

    Ok(decoded
        .results
        .into_iter()
        .take(expected)
        .map(|p| CandidateUser {
            first_name: p.name.first,
            last_name: p.name.last,
            email: p.email,
            age: p.dob.age,
        })
        .collect())
}
