use crate::{CoreError, Record};
use async_trait::async_trait;

/// Where the polling loop gets posts from.
///
/// Implementations count transport failures themselves and hand back empty
/// results for them; an `Err` from any method is meant to stop the loop.
#[async_trait]
pub trait PostSource: Send {
    async fn bootstrap_session(&mut self) -> Result<(), CoreError>;

    async fn resolve_user(&mut self, handle: &str) -> Result<(), CoreError>;

    async fn fetch_latest(&mut self, handle: &str, count: u32)
        -> Result<Vec<Record>, CoreError>;

    async fn fetch_since(&mut self, handle: &str, since: i64) -> Result<Vec<Record>, CoreError>;
}
