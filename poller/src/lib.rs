//! The ingestion loop: fetch what is new since the cursor, drop what was
//! already seen, append the rest to the store.

use postwatch_core::{AppConfig, CoreError, Cursor, PostSource, Record};
use std::future::Future;
use std::time::Duration;
use store::RecordStore;
use tokio::sync::watch;
use tracing::{debug, info};


#[derive(Debug, Clone)]
pub struct PollSettings {
    pub handle: String,
    pub interval: Duration,
    pub jitter: Duration,
    pub latest_count: u32,
}

impl PollSettings {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            handle: config.handle()?.to_string(),
            interval: config.poll_interval(),
            jitter: config.poll_jitter(),
            latest_count: config.latest_count,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Startup,
    Steady,
}

pub struct PollingService<S: PostSource> {
    source: S,
    store: RecordStore,
    settings: PollSettings,
    cursor: Cursor,
    state: PollState,
}

impl<S: PostSource> PollingService<S> {
    pub fn new(source: S, store: RecordStore, settings: PollSettings) -> Self {
        Self {
            source,
            store,
            settings,
            cursor: Cursor::start_now(),
            state: PollState::Startup,
        }
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Establishes the session and ingests the latest few posts.
    pub async fn startup(&mut self) -> Result<Vec<Record>, CoreError> {
        let records = self.open_session().await?;
        self.ingest_latest(records).await
    }

    async fn open_session(&mut self) -> Result<Vec<Record>, CoreError> {
        let handle = self.settings.handle.clone();
        info!("Following @{}", handle);

        self.source.bootstrap_session().await?;
        self.source.resolve_user(&handle).await?;
        self.source
            .fetch_latest(&handle, self.settings.latest_count)
            .await
    }

    async fn ingest_latest(&mut self, records: Vec<Record>) -> Result<Vec<Record>, CoreError> {
        if let Some(last) = records.last() {
            self.cursor = Cursor::Seen(last.clone());
        }
        for record in &records {
            info!("{}", record);
        }
        self.store.append_all(&records).await?;

        self.state = PollState::Steady;
        Ok(records)
    }

    /// One steady-state fetch. Returns the records that were new.
    pub async fn poll_once(&mut self) -> Result<Vec<Record>, CoreError> {
        let records = self.fetch_new().await?;
        self.ingest_new(records).await
    }

    async fn fetch_new(&mut self) -> Result<Vec<Record>, CoreError> {
        info!("#### Checking for new posts ####");
        let mut records = self
            .source
            .fetch_since(&self.settings.handle, self.cursor.since())
            .await?;

        // `since:` is inclusive, so the cursor post usually comes back
        if let Some(last_id) = self.cursor.last_id() {
            records.retain(|record| record.id() != last_id);
        }
        Ok(records)
    }

    async fn ingest_new(&mut self, records: Vec<Record>) -> Result<Vec<Record>, CoreError> {
        let Some(last) = records.last().cloned() else {
            info!("#### No new posts since {} ####", self.cursor.time());
            return Ok(records);
        };

        for record in &records {
            info!("{}", record);
        }
        self.store.append_all(&records).await?;
        self.cursor = Cursor::Seen(last);

        Ok(records)
    }

    /// Base interval plus a random share of the jitter window.
    pub fn next_delay(&self) -> Duration {
        let jitter_ms = u64::try_from(self.settings.jitter.as_millis()).unwrap_or(u64::MAX);
        self.settings
            .interval
            .saturating_add(Duration::from_millis(fastrand::u64(0..=jitter_ms)))
    }

    /// Runs startup (if not done yet) and then polls until `stop` turns true.
    ///
    /// The stop flag is honoured while sleeping and while waiting on the
    /// source. Appends to the store always run to completion, so a stop never
    /// leaves a torn frame behind. Returns `Ok(())` when stopped and `Err` on
    /// the first fatal error.
    pub async fn run(&mut self, mut stop: watch::Receiver<bool>) -> Result<(), CoreError> {
        if self.state == PollState::Startup {
            let Some(records) = until_stopped(&mut stop, self.open_session()).await else {
                info!("Stop requested during startup");
                return Ok(());
            };
            self.ingest_latest(records?).await?;
        }

        loop {
            let delay = self.next_delay();
            debug!("Sleeping {:?} before the next poll", delay);

            if until_stopped(&mut stop, tokio::time::sleep(delay))
                .await
                .is_none()
            {
                info!("Stop requested, leaving the polling loop");
                return Ok(());
            }

            let Some(records) = until_stopped(&mut stop, self.fetch_new()).await else {
                info!("Stop requested while fetching, leaving the polling loop");
                return Ok(());
            };
            self.ingest_new(records?).await?;
        }
    }
}

/// Drives `work` unless the stop flag wins first, in which case `work` is dropped.
async fn until_stopped<F: Future>(stop: &mut watch::Receiver<bool>, work: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = stop_requested(stop) => None,
        output = work => Some(output),
    }
}

/// Resolves once the flag is set. A dropped sender means nobody can stop us.
async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    loop {
        if *stop.borrow_and_update() {
            return;
        }
        if stop.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
