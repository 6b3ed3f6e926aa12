pub mod api;
pub mod failure_budget;
pub mod metrics;
pub mod parser;
pub mod session;


use api::{Endpoints, SearchQuery, TwitterApiClient};
use async_trait::async_trait;
use failure_budget::{FailureBudget, DEFAULT_FAILURE_THRESHOLD};
use metrics::ApiMetrics;
use parser::ResponseParser;
use postwatch_core::{AppConfig, CoreError, ErrorExt, PostSource, Record, TwitterApiError};
use session::{extract_guest_token, Session};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_LATEST_COUNT: u32 = 5;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoints: Endpoints,
    pub request_timeout: Duration,
    pub failure_threshold: u32,
}

impl ClientConfig {
    pub fn twitter() -> Result<Self, CoreError> {
        Ok(Self {
            endpoints: Endpoints::twitter()?,
            request_timeout: Duration::from_secs(30),
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
        })
    }

    pub fn from_app_config(config: &AppConfig) -> Result<Self, CoreError> {
        Ok(Self {
            endpoints: Endpoints::twitter()?,
            request_timeout: config.request_timeout(),
            failure_threshold: config.failure_threshold,
        })
    }
}

/// Guest-session client for one process.
///
/// Transport failures of any operation are counted against a shared
/// [`FailureBudget`] and answered with an empty result; once the budget is
/// spent the operation returns [`CoreError::FailureBudgetExhausted`].
#[derive(Debug)]
pub struct TwitterClient {
    api: TwitterApiClient,
    session: Session,
    parser: ResponseParser,
    budget: FailureBudget,
}

impl TwitterClient {
    pub fn new(config: ClientConfig) -> Result<Self, CoreError> {
        Ok(Self {
            api: TwitterApiClient::new(config.endpoints, config.request_timeout)?,
            session: Session::new(),
            parser: ResponseParser::new(),
            budget: FailureBudget::new(config.failure_threshold),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn parser(&self) -> &ResponseParser {
        &self.parser
    }

    pub fn failures(&self) -> u32 {
        self.budget.failures()
    }

    pub async fn stats(&self) -> ApiMetrics {
        self.api.metrics().snapshot().await
    }

    /// Obtains a guest token from the home page and installs it in the session.
    pub async fn bootstrap_session(&mut self) -> Result<(), CoreError> {
        let body = match self.api.get_home_page(self.session.headers()).await {
            Ok(body) => body,
            Err(e) if e.is_transport() => {
                e.log_warn();
                self.budget.record_failure("guest session bootstrap")?;
                return Err(TwitterApiError::Bootstrap {
                    reason: e.to_string(),
                }
                .into());
            }
            Err(e) => return Err(e),
        };

        let token = extract_guest_token(&body).ok_or_else(|| TwitterApiError::Bootstrap {
            reason: "no gt cookie in home page".to_string(),
        })?;
        self.session.install_guest_token(&token)?;
        debug!("guest token generated");
        Ok(())
    }

    /// Registers the user id behind `handle` with the parser.
    ///
    /// A transport failure keeps whatever id was registered before. A handle
    /// that was never resolved makes every later search for it come back empty.
    pub async fn resolve_user(&mut self, handle: &str) -> Result<(), CoreError> {
        let user_json = match self
            .api
            .get_user_by_screen_name(self.session.headers(), handle)
            .await
        {
            Ok(json) => json,
            Err(e) if e.is_transport() => {
                e.log_warn();
                self.budget
                    .record_failure(&format!("user id lookup for {handle}"))?;
                if !self.parser.is_resolved(handle) {
                    warn!("@{} is unresolved; its posts will be filtered out", handle);
                }
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        self.parser.resolve_handle(handle, &user_json)
    }

    pub async fn fetch_latest(
        &mut self,
        handle: &str,
        count: u32,
    ) -> Result<Vec<Record>, CoreError> {
        let records = self
            .search(handle, SearchQuery::Latest { handle, count })
            .await?;
        info!("Fetched {} latest posts for @{}", records.len(), handle);
        Ok(records)
    }

    pub async fn fetch_since(&mut self, handle: &str, since: i64) -> Result<Vec<Record>, CoreError> {
        let records = self
            .search(handle, SearchQuery::Since { handle, since })
            .await?;
        debug!("Fetched {} posts since {} for @{}", records.len(), since, handle);
        Ok(records)
    }

    async fn search(
        &mut self,
        handle: &str,
        query: SearchQuery<'_>,
    ) -> Result<Vec<Record>, CoreError> {
        let search_json = match self.api.search(self.session.headers(), query).await {
            Ok(json) => json,
            Err(e) if e.is_transport() => {
                e.log_warn();
                let operation = match query {
                    SearchQuery::Latest { count, .. } => {
                        format!("fetch of the {count} most recent posts for {handle}")
                    }
                    SearchQuery::Since { since, .. } => {
                        format!("fetch of posts since {since} for {handle}")
                    }
                };
                self.budget.record_failure(&operation)?;
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        self.parser.parse_records(&search_json, handle)
    }
}

#[async_trait]
impl PostSource for TwitterClient {
    async fn bootstrap_session(&mut self) -> Result<(), CoreError> {
        TwitterClient::bootstrap_session(self).await
    }

    async fn resolve_user(&mut self, handle: &str) -> Result<(), CoreError> {
        TwitterClient::resolve_user(self, handle).await
    }

    async fn fetch_latest(
        &mut self,
        handle: &str,
        count: u32,
    ) -> Result<Vec<Record>, CoreError> {
        TwitterClient::fetch_latest(self, handle, count).await
    }

    async fn fetch_since(&mut self, handle: &str, since: i64) -> Result<Vec<Record>, CoreError> {
        TwitterClient::fetch_since(self, handle, since).await
    }
}
