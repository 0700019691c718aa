// src/client/graphql.rs

//! GraphQL transport with bounded retry, credential rotation, and
//! adaptive-load signaling.
//!
//! Each logical call gets at most [`MAX_ATTEMPTS`] exchanges. Rate-limit
//! and auth failures rotate the credential; server and network failures
//! back off on the same credential; a query-timeout error is signaled
//! upward so the caller shrinks its batch instead of retrying blindly.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::client::queries;
use crate::client::rotator::TokenRotator;
use crate::error::{AppError, Result};
use crate::models::response::{GraphQlError, RateLimit, ReadmeEnvelope, SearchEnvelope, SearchPage};

/// Attempts per logical call before `RetriesExhausted`.
const MAX_ATTEMPTS: u32 = 5;
/// Delay before retrying after a malformed payload or unexpected status.
const FIXED_DELAY: Duration = Duration::from_secs(5);
/// Delay after rotating away from a rate-limited or forbidden credential.
const ROTATE_DELAY: Duration = Duration::from_secs(2);
/// Delay after network timeouts and connection errors.
const NETWORK_DELAY: Duration = Duration::from_secs(10);
/// Cap for the progressive gateway backoff, in seconds.
const GATEWAY_BACKOFF_CAP: u64 = 60;

/// Raw outcome of one logical call.
#[derive(Debug)]
pub enum CallOutcome {
    /// The response envelope, possibly carrying non-fatal GraphQL errors.
    Envelope(Value),
    /// The API reported a query timeout; the caller must shrink its batch.
    BatchTooLarge,
}

/// Typed outcome of a paginated search call.
#[derive(Debug)]
pub enum SearchOutcome {
    Page(SearchPage),
    BatchTooLarge,
}

/// Next step after classifying a failed exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    /// Retry on the same credential after the delay.
    Retry(Duration),
    /// Advance the credential, then retry after the delay.
    RotateAndRetry(Duration),
}

/// Retry policy for non-200 HTTP statuses.
fn decide_status(status: StatusCode, attempt: u32) -> Decision {
    match status.as_u16() {
        401 => Decision::RotateAndRetry(Duration::ZERO),
        403 => Decision::RotateAndRetry(ROTATE_DELAY),
        502 | 503 | 504 => Decision::Retry(gateway_backoff(attempt)),
        _ => Decision::Retry(FIXED_DELAY),
    }
}

/// Progressive backoff for gateway errors, capped at one minute.
fn gateway_backoff(attempt: u32) -> Duration {
    Duration::from_secs(GATEWAY_BACKOFF_CAP.min(10 * u64::from(attempt)))
}

/// GraphQL-level failure classes, matched on error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GraphQlFailure {
    RateLimited,
    QueryTimeout,
    Other,
}

fn classify_graphql_errors(errors: &[GraphQlError]) -> GraphQlFailure {
    let contains = |needle: &str| {
        errors
            .iter()
            .any(|error| error.message.to_lowercase().contains(needle))
    };

    if contains("rate limit") {
        GraphQlFailure::RateLimited
    } else if contains("timeout") {
        GraphQlFailure::QueryTimeout
    } else {
        GraphQlFailure::Other
    }
}

/// Client for the GitHub GraphQL endpoint.
pub struct GraphQlClient {
    http: Client,
    api_url: String,
    rotator: TokenRotator,
}

impl GraphQlClient {
    pub fn new(http: Client, api_url: String, rotator: TokenRotator) -> Self {
        Self {
            http,
            api_url,
            rotator,
        }
    }

    /// Execute one logical GraphQL call with bounded retry.
    pub async fn execute(&mut self, query: &str) -> Result<CallOutcome> {
        for attempt in 1..=MAX_ATTEMPTS {
            let token = self.rotator.current()?.to_string();
            let response = self
                .http
                .post(&self.api_url)
                .bearer_auth(token)
                .json(&serde_json::json!({ "query": query, "variables": {} }))
                .send()
                .await;

            let response = match response {
                Ok(response) => response,
                Err(error) => {
                    log::warn!(
                        "Request failed (attempt {attempt}/{MAX_ATTEMPTS}): {error}"
                    );
                    let delay = if error.is_timeout() || error.is_connect() {
                        NETWORK_DELAY
                    } else {
                        FIXED_DELAY
                    };
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };

            let status = response.status();
            if status != StatusCode::OK {
                log::warn!("HTTP {status} from API (attempt {attempt}/{MAX_ATTEMPTS})");
                match decide_status(status, attempt) {
                    Decision::Retry(delay) => tokio::time::sleep(delay).await,
                    Decision::RotateAndRetry(delay) => {
                        self.rotator.advance()?;
                        tokio::time::sleep(delay).await;
                    }
                }
                continue;
            }

            let payload: Value = match response.json().await {
                Ok(payload) => payload,
                Err(error) => {
                    log::warn!(
                        "Malformed JSON response (attempt {attempt}/{MAX_ATTEMPTS}): {error}"
                    );
                    tokio::time::sleep(FIXED_DELAY).await;
                    continue;
                }
            };

            // The quota probe is informational; a low balance rotates the
            // credential for subsequent requests.
            if let Some(rate_limit) = payload.pointer("/data/rateLimit") {
                if let Ok(rate_limit) = serde_json::from_value::<RateLimit>(rate_limit.clone()) {
                    log::debug!("Rate limit: {} remaining", rate_limit.remaining);
                    self.rotator
                        .record_quota(rate_limit.remaining, &rate_limit.reset_at)?;
                    if self.rotator.should_rotate(rate_limit.remaining) {
                        self.rotator.advance()?;
                    }
                }
            }

            if let Some(raw_errors) = payload.get("errors") {
                let errors: Vec<GraphQlError> =
                    serde_json::from_value(raw_errors.clone()).unwrap_or_default();
                match classify_graphql_errors(&errors) {
                    GraphQlFailure::RateLimited => {
                        log::warn!("Rate limit reported in response, switching token");
                        self.rotator.advance()?;
                        tokio::time::sleep(ROTATE_DELAY).await;
                        continue;
                    }
                    GraphQlFailure::QueryTimeout => {
                        log::warn!("Query timeout reported, caller should shrink its batch");
                        return Ok(CallOutcome::BatchTooLarge);
                    }
                    GraphQlFailure::Other => {
                        log::warn!("GraphQL errors in response: {raw_errors}");
                        return Ok(CallOutcome::Envelope(payload));
                    }
                }
            }

            return Ok(CallOutcome::Envelope(payload));
        }

        Err(AppError::retries_exhausted(MAX_ATTEMPTS, "GraphQL call"))
    }

    /// Fetch one page of search results.
    pub async fn search(
        &mut self,
        search_query: &str,
        batch_size: u32,
        after_cursor: Option<&str>,
    ) -> Result<SearchOutcome> {
        let document = queries::search_request(search_query, batch_size, after_cursor);
        match self.execute(&document).await? {
            CallOutcome::BatchTooLarge => Ok(SearchOutcome::BatchTooLarge),
            CallOutcome::Envelope(payload) => {
                let envelope: SearchEnvelope = serde_json::from_value(payload)
                    .map_err(|error| AppError::malformed(format!("search response: {error}")))?;
                let page = envelope
                    .data
                    .and_then(|data| data.search)
                    .ok_or_else(|| AppError::malformed("search response missing data.search"))?;
                Ok(SearchOutcome::Page(page))
            }
        }
    }

    /// Fetch README text for one repository, probing all filename variants.
    pub async fn fetch_readme(&mut self, owner: &str, name: &str) -> Result<Option<String>> {
        let document = queries::readme_request(owner, name);
        match self.execute(&document).await? {
            CallOutcome::BatchTooLarge => Ok(None),
            CallOutcome::Envelope(payload) => {
                let envelope: ReadmeEnvelope = serde_json::from_value(payload)
                    .map_err(|error| AppError::malformed(format!("readme response: {error}")))?;
                Ok(envelope
                    .data
                    .and_then(|data| data.repository)
                    .and_then(|variants| variants.first_text()))
            }
        }
    }

    /// Number of configured credentials, for startup logging.
    pub fn token_count(&self) -> usize {
        self.rotator.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, tokens: &[&str]) -> GraphQlClient {
        let rotator = TokenRotator::new(tokens.iter().map(|t| t.to_string()).collect(), 100);
        GraphQlClient::new(Client::new(), server.uri(), rotator)
    }

    #[test]
    fn gateway_backoff_is_monotonic_and_capped() {
        let mut previous = Duration::ZERO;
        for attempt in 1..=10 {
            let wait = gateway_backoff(attempt);
            assert_eq!(
                wait,
                Duration::from_secs(60.min(10 * u64::from(attempt)))
            );
            assert!(wait >= previous);
            previous = wait;
        }
        assert_eq!(gateway_backoff(7), Duration::from_secs(60));
    }

    #[test]
    fn status_decisions_follow_the_table() {
        assert_eq!(
            decide_status(StatusCode::UNAUTHORIZED, 1),
            Decision::RotateAndRetry(Duration::ZERO)
        );
        assert_eq!(
            decide_status(StatusCode::FORBIDDEN, 1),
            Decision::RotateAndRetry(ROTATE_DELAY)
        );
        assert_eq!(
            decide_status(StatusCode::BAD_GATEWAY, 3),
            Decision::Retry(Duration::from_secs(30))
        );
        assert_eq!(
            decide_status(StatusCode::IM_A_TEAPOT, 1),
            Decision::Retry(FIXED_DELAY)
        );
    }

    #[test]
    fn graphql_error_classification_matches_messages() {
        let errors = |message: &str| {
            vec![GraphQlError {
                message: message.to_string(),
            }]
        };
        assert_eq!(
            classify_graphql_errors(&errors("API rate limit exceeded")),
            GraphQlFailure::RateLimited
        );
        assert_eq!(
            classify_graphql_errors(&errors("Something went wrong: timeout")),
            GraphQlFailure::QueryTimeout
        );
        assert_eq!(
            classify_graphql_errors(&errors("Field 'foo' doesn't exist")),
            GraphQlFailure::Other
        );
        assert_eq!(classify_graphql_errors(&[]), GraphQlFailure::Other);
    }

    #[tokio::test]
    async fn low_quota_rotates_credential_for_next_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "rateLimit": {"remaining": 50, "resetAt": "2024-05-01T00:00:00Z"}
                }
            })))
            .mount(&server)
            .await;

        let mut client = client_for(&server, &["first", "second"]);
        client.execute("query { rateLimit { remaining resetAt } }").await.unwrap();

        // 50 <= threshold 100, so the next request uses the second token.
        assert_eq!(client.rotator.current().unwrap(), "second");
        assert_eq!(client.rotator.observed("first").unwrap().remaining, 50);
    }

    #[tokio::test]
    async fn unauthorized_rotates_and_exhausts_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let mut client = client_for(&server, &["a", "b"]);
        let result = client.execute("query { viewer { login } }").await;

        assert!(matches!(
            result,
            Err(AppError::RetriesExhausted { attempts: 5, .. })
        ));
        // Five rotations across two tokens land on index 5 % 2 = 1.
        assert_eq!(client.rotator.current().unwrap(), "b");
    }

    #[tokio::test]
    async fn query_timeout_signals_batch_too_large() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null,
                "errors": [{"message": "Something went wrong executing your query. This may be the result of a timeout."}]
            })))
            .mount(&server)
            .await;

        let mut client = client_for(&server, &["a"]);
        let outcome = client.execute("query { search }").await.unwrap();
        assert!(matches!(outcome, CallOutcome::BatchTooLarge));
    }

    #[tokio::test]
    async fn other_graphql_errors_return_the_partial_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"search": null},
                "errors": [{"message": "Field 'nope' doesn't exist"}]
            })))
            .mount(&server)
            .await;

        let mut client = client_for(&server, &["a"]);
        let outcome = client.execute("query { nope }").await.unwrap();
        match outcome {
            CallOutcome::Envelope(payload) => {
                assert!(payload.get("errors").is_some());
            }
            CallOutcome::BatchTooLarge => panic!("expected an envelope"),
        }
    }

    #[tokio::test]
    async fn fetch_readme_returns_first_variant_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("repository(owner"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "repository": {
                        "readme": null,
                        "readmeLower": {"text": "lowercase readme body"},
                        "readmeUpper": null,
                        "readmeRst": {"text": "rst body"}
                    }
                }
            })))
            .mount(&server)
            .await;

        let mut client = client_for(&server, &["a"]);
        let readme = client.fetch_readme("acme", "demo").await.unwrap();
        assert_eq!(readme.as_deref(), Some("lowercase readme body"));
    }
}
