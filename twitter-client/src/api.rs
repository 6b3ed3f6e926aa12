use crate::metrics::{MetricsCollector, RequestOutcome};
use postwatch_core::{CoreError, ErrorExt, TwitterApiError};
use reqwest::header::HeaderMap;
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

pub const HOME_URL: &str = "https://twitter.com/";
pub const USER_LOOKUP_URL: &str =
    "https://twitter.com/i/api/graphql/jMaTS-_Ea8vh9rpKggJbCQ/UserByScreenName";
pub const SEARCH_URL: &str = "https://api.twitter.com/2/search/adaptive.json";

const USER_LOOKUP_PATH: &str = "i/api/graphql/jMaTS-_Ea8vh9rpKggJbCQ/UserByScreenName";
const SEARCH_PATH: &str = "2/search/adaptive.json";

/// The three URLs the client talks to.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub home: Url,
    pub user_lookup: Url,
    pub search: Url,
}

impl Endpoints {
    pub fn twitter() -> Result<Self, CoreError> {
        Ok(Self {
            home: parse_url(HOME_URL)?,
            user_lookup: parse_url(USER_LOOKUP_URL)?,
            search: parse_url(SEARCH_URL)?,
        })
    }

    /// Serves every endpoint from one host, keeping the production paths.
    pub fn with_base(base: &Url) -> Result<Self, CoreError> {
        Ok(Self {
            home: base.clone(),
            user_lookup: join_url(base, USER_LOOKUP_PATH)?,
            search: join_url(base, SEARCH_PATH)?,
        })
    }
}

fn parse_url(raw: &str) -> Result<Url, CoreError> {
    Url::parse(raw).map_err(|e| CoreError::Internal {
        message: format!("invalid endpoint URL {raw}: {e}"),
    })
}

fn join_url(base: &Url, path: &str) -> Result<Url, CoreError> {
    base.join(path).map_err(|e| CoreError::Internal {
        message: format!("invalid endpoint path {path}: {e}"),
    })
}

#[derive(Debug)]
pub struct TwitterApiClient {
    http_client: Client,
    metrics: MetricsCollector,
    endpoints: Endpoints,
}

impl TwitterApiClient {
    pub fn new(endpoints: Endpoints, request_timeout: Duration) -> Result<Self, CoreError> {
        let http_client = Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            http_client,
            metrics: MetricsCollector::new(),
            endpoints,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Sends a GET and maps non-success statuses to [`TwitterApiError`]s.
    ///
    /// Every error returned here is a transport failure in the `ErrorExt::is_transport` sense.
    pub async fn make_request(
        &self,
        endpoint: &'static str,
        url: &Url,
        headers: &HeaderMap,
        query_params: &[(&str, String)],
    ) -> Result<Response, CoreError> {
        let start_time = Instant::now();
        let mut status_code = None;

        let request_builder = self
            .http_client
            .get(url.clone())
            .headers(headers.clone())
            .query(query_params);

        info!("Making Twitter request: GET {}", endpoint);
        let outcome: Result<Response, CoreError> = match request_builder.send().await {
            Ok(response) => {
                let status = response.status();
                status_code = Some(status.as_u16());

                if status.is_success() {
                    debug!("Request successful: {} {}", status, endpoint);
                    Ok(response)
                } else {
                    error!("Request failed with status: {} for {}", status, endpoint);
                    match status.as_u16() {
                        429 => {
                            let retry_after = response
                                .headers()
                                .get("retry-after")
                                .and_then(|v| v.to_str().ok())
                                .and_then(|v| v.parse::<u64>().ok())
                                .unwrap_or(60);
                            warn!("Rate limited, retry after {} seconds", retry_after);
                            Err(TwitterApiError::RateLimitExceeded { retry_after }.into())
                        }
                        401 => Err(TwitterApiError::InvalidToken.into()),
                        403 => Err(TwitterApiError::Forbidden {
                            resource: endpoint.to_string(),
                        }
                        .into()),
                        404 => Err(TwitterApiError::NotFound {
                            resource: endpoint.to_string(),
                        }
                        .into()),
                        code if status.is_server_error() => {
                            Err(TwitterApiError::ServerError { status_code: code }.into())
                        }
                        code => Err(TwitterApiError::UnexpectedStatus { status_code: code }.into()),
                    }
                }
            }
            Err(e) => {
                error!("Network error for GET {}: {}", endpoint, e);
                if e.is_timeout() {
                    Err(TwitterApiError::RequestTimeout.into())
                } else {
                    Err(CoreError::Network(e))
                }
            }
        };

        self.metrics
            .record(RequestOutcome {
                endpoint,
                status: status_code,
                latency: start_time.elapsed(),
                error_code: outcome.as_ref().err().map(|e| e.error_code()),
            })
            .await;

        outcome
    }

    /// GETs the home page body as text.
    pub async fn get_home_page(&self, headers: &HeaderMap) -> Result<String, CoreError> {
        let response = self
            .make_request("home", &self.endpoints.home, headers, &[])
            .await?;
        Ok(response.text().await?)
    }

    pub async fn get_user_by_screen_name(
        &self,
        headers: &HeaderMap,
        handle: &str,
    ) -> Result<Value, CoreError> {
        let variables = serde_json::json!({
            "screen_name": handle,
            "withHighlightedLabel": true,
        });
        let response = self
            .make_request(
                "user_lookup",
                &self.endpoints.user_lookup,
                headers,
                &[("variables", variables.to_string())],
            )
            .await?;
        read_json(response, "users").await
    }

    /// Live search for a handle's own posts, replies excluded.
    pub async fn search(
        &self,
        headers: &HeaderMap,
        query: SearchQuery<'_>,
    ) -> Result<Value, CoreError> {
        let response = self
            .make_request("search", &self.endpoints.search, headers, &query.params())
            .await?;
        read_json(response, "tweets").await
    }
}

/// The two search variants the client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchQuery<'a> {
    Latest { handle: &'a str, count: u32 },
    Since { handle: &'a str, since: i64 },
}

impl SearchQuery<'_> {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(4);
        match self {
            SearchQuery::Latest { handle, count } => {
                params.push(("count", count.to_string()));
                params.push(("q", format!("from:{handle} -filter:replies")));
            }
            SearchQuery::Since { handle, since } => {
                params.push(("q", format!("from:{handle} -filter:replies since:{since}")));
            }
        }
        // do not truncate, newest first
        params.push(("tweet_mode", "extended".to_string()));
        params.push(("tweet_search_mode", "live".to_string()));
        params
    }
}

/// Reads a success body as JSON; a body that is not JSON means the API changed.
async fn read_json(response: Response, context: &str) -> Result<Value, CoreError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        error!("Failed to parse {} response: {}", context, e);
        TwitterApiError::schema(context).into()
    })
}
