//! Question synchronization and reconciliation.
//!
//! A cycle runs four passes in order:
//!
//! 1. [`Engine::sync_new`]: page through questions created after the
//!    watermark and store them.
//! 2. [`Engine::sync_updates`]: re-fetch the tracked window by id.
//! 3. [`Engine::post_new`]: post tracked questions that have no chat message.
//! 4. [`Engine::update_tracked`]: refresh linked messages and retire the ones
//!    that fell out of the window.
//!
//! The tracked window is always re-derived from the store: the
//! `questions-to-watch` most recently created questions.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use stackexchange::{Query, QuestionItem, QuestionsEnvelope, Quota};
use store::{ChatLink, QuestionRecord, Store, StoreError, UpsertOutcome, UserRecord};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::SyncError;
use crate::projector;
use crate::source::{ChatSink, QuestionSource};

/// Hard ceiling of pages fetched per query.
pub const MAX_PAGES: u32 = 10;

/// Stack Exchange accepts at most 100 ids per `/questions/{ids}` call.
pub const IDS_PER_REQUEST: usize = 100;

/// How far back an incremental fetch may reach.
pub fn max_lookback() -> TimeDelta {
    TimeDelta::hours(4)
}

/// Engine inputs taken from the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub site: String,
    pub questions_to_watch: usize,
    pub channel: Option<String>,
    pub team_icon: Option<String>,
    pub search_overrides: BTreeMap<String, String>,
    pub questions_overrides: BTreeMap<String, String>,
    pub slack_enabled: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            site: config.stackexchange.site.clone(),
            questions_to_watch: config.stackexchange.questions_to_watch,
            channel: config.slack.channel.clone(),
            team_icon: config.slack.team_icon.clone(),
            search_overrides: config.stackexchange.search_advanced.clone(),
            questions_overrides: config.stackexchange.questions.clone(),
            slack_enabled: config.slack.enabled,
        }
    }
}

/// Outcome of a fetch pass (`sync_new` or `sync_updates`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub pages: u32,
    pub fetched: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub users_written: usize,
    /// Seconds the API asked us to back off, if it did.
    pub backoff_secs: Option<u64>,
    pub cancelled: bool,
    pub errors: Vec<String>,
}

impl SyncReport {
    fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Created => self.created += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Unchanged => self.unchanged += 1,
        }
    }

    /// Rows written to the questions table.
    pub fn writes(&self) -> usize {
        self.created + self.updated
    }
}

/// Outcome of a chat pass (`post_new` or `update_tracked`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatReport {
    pub posted: usize,
    pub already_linked: usize,
    pub updated: usize,
    pub retired: usize,
    /// Links whose question row was missing.
    pub dangling: usize,
    pub cancelled: bool,
    pub errors: Vec<String>,
}

/// Outcome of a full cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub new_questions: SyncReport,
    pub updates: SyncReport,
    pub posts: ChatReport,
    pub chat_updates: ChatReport,
    pub chat_skipped: bool,
    /// Passes that could not run at all.
    pub failures: Vec<String>,
    pub watermark: Option<DateTime<Utc>>,
    pub quota: Quota,
}

impl CycleReport {
    /// Every error of the cycle, pass failures first.
    pub fn errors(&self) -> impl Iterator<Item = &String> {
        self.failures
            .iter()
            .chain(&self.new_questions.errors)
            .chain(&self.updates.errors)
            .chain(&self.posts.errors)
            .chain(&self.chat_updates.errors)
    }

    pub fn is_clean(&self) -> bool {
        self.errors().next().is_none()
    }
}

/// Result of one page request.
enum Fetched {
    Page(QuestionsEnvelope),
    /// Page ceiling reached; the query is done.
    Ceiling,
    /// Cancelled or failed; the pass must stop.
    Aborted,
}

pub struct Engine {
    store: Arc<Store>,
    source: Arc<dyn QuestionSource>,
    sink: Option<Arc<dyn ChatSink>>,
    settings: EngineSettings,
    watermark: Option<DateTime<Utc>>,
    cancel: CancellationToken,
}

impl Engine {
    pub fn new(
        store: Arc<Store>,
        source: Arc<dyn QuestionSource>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            source,
            sink: None,
            settings,
            watermark: None,
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ChatSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Last committed watermark.
    pub fn watermark(&self) -> Option<DateTime<Utc>> {
        self.watermark
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Takes effect on the next pass.
    pub fn set_questions_to_watch(&mut self, n: usize) {
        self.settings.questions_to_watch = n;
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn quota(&self) -> Quota {
        self.source.quota()
    }

    /// Lower bound of the next incremental fetch and whether the store is empty.
    ///
    /// Newest of the stored creation times and the committed watermark,
    /// raised to `now - 4h` when older or absent.
    pub fn resolve_watermark(
        &self,
        now: DateTime<Utc>,
    ) -> Result<(DateTime<Utc>, bool), StoreError> {
        let floor = now - max_lookback();
        let stored = self.store.latest_question()?.map(|q| q.creation_date);
        let bootstrap = stored.is_none();

        let from = match stored.max(self.watermark) {
            Some(watermark) if watermark >= floor => watermark,
            Some(watermark) => {
                info!(%watermark, %floor, "Watermark older than lookback, clamping");
                floor
            }
            None => floor,
        };
        Ok((from, bootstrap))
    }

    /// `/search/advanced` query for questions created after `from`.
    pub fn new_questions_query(&self, from: DateTime<Utc>) -> Query {
        let mut query = self.source.search_advanced();
        apply_overrides(&mut query, &self.settings.search_overrides);
        query.parameters.set("site", self.settings.site.as_str());
        query
            .parameters
            .set("fromdate", (from + TimeDelta::seconds(1)).timestamp());
        query
    }

    /// `/questions/{ids}` query for one chunk of the tracked window.
    pub fn tracked_query(&self, ids: &[i64]) -> Query {
        let mut query = self.source.questions(ids);
        apply_overrides(&mut query, &self.settings.questions_overrides);
        query.parameters.set("site", self.settings.site.as_str());
        query
    }

    /// Fetch and store questions created after the watermark.
    ///
    /// On an empty store only the newest question is kept so a first run does
    /// not flood the channel with the backlog.
    pub async fn sync_new(&mut self) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();
        let (from, bootstrap) = self.resolve_watermark(Utc::now())?;
        self.watermark = Some(self.watermark.map_or(from, |w| w.max(from)));

        info!(%from, bootstrap, "Fetching new questions");

        let mut query = self.new_questions_query(from);

        let mut newest: Option<QuestionItem> = None;

        'pages: loop {
            let Fetched::Page(envelope) = self.fetch_page(&mut query, &mut report).await else {
                break;
            };

            let mut page_max: Option<DateTime<Utc>> = None;
            for item in envelope.items {
                if self.cancel.is_cancelled() {
                    report.cancelled = true;
                    self.commit_watermark(page_max);
                    break 'pages;
                }

                if bootstrap {
                    let is_newer = newest.as_ref().map_or(true, |n| {
                        (item.creation_date, item.question_id) > (n.creation_date, n.question_id)
                    });
                    if is_newer {
                        newest = Some(item);
                    }
                    continue;
                }

                match self.persist(&item, &mut report) {
                    Ok(()) => page_max = page_max.max(Some(item.created_at())),
                    Err(e) => {
                        error!(question_id = item.question_id, error = %e, "Failed to store question");
                        report
                            .errors
                            .push(format!("question {}: {e}", item.question_id));
                        self.commit_watermark(page_max);
                        break 'pages;
                    }
                }
            }
            self.commit_watermark(page_max);

            if !advance(&mut query, &report) {
                break;
            }
        }

        if let Some(item) = newest {
            debug!(question_id = item.question_id, "Keeping newest question of backlog");
            match self.persist(&item, &mut report) {
                Ok(()) => self.commit_watermark(Some(item.created_at())),
                Err(e) => report
                    .errors
                    .push(format!("question {}: {e}", item.question_id)),
            }
        }

        info!(
            fetched = report.fetched,
            created = report.created,
            updated = report.updated,
            watermark = ?self.watermark,
            "New questions synced"
        );
        Ok(report)
    }

    /// Re-fetch the tracked window by id and store changes.
    pub async fn sync_updates(&mut self) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();
        let ids = self.store.tracked_ids(self.settings.questions_to_watch)?;
        if ids.is_empty() {
            info!("No tracked questions to update");
            return Ok(report);
        }

        info!(count = ids.len(), "Updating tracked questions");

        for chunk in ids.chunks(IDS_PER_REQUEST) {
            let mut query = self.tracked_query(chunk);

            loop {
                let envelope = match self.fetch_page(&mut query, &mut report).await {
                    Fetched::Page(envelope) => envelope,
                    Fetched::Ceiling => break,
                    Fetched::Aborted => return Ok(report),
                };

                for item in envelope.items {
                    if self.cancel.is_cancelled() {
                        report.cancelled = true;
                        return Ok(report);
                    }
                    if let Err(e) = self.persist(&item, &mut report) {
                        error!(question_id = item.question_id, error = %e, "Failed to store question");
                        report
                            .errors
                            .push(format!("question {}: {e}", item.question_id));
                    }
                }

                if !advance(&mut query, &report) {
                    break;
                }
            }

            if report.backoff_secs.is_some() {
                break;
            }
        }

        info!(
            fetched = report.fetched,
            updated = report.updated,
            unchanged = report.unchanged,
            "Tracked questions synced"
        );
        Ok(report)
    }

    /// Post tracked questions that have no chat message yet, oldest first.
    ///
    /// A failed post ends the pass; the remaining questions are posted on the
    /// next cycle.
    pub async fn post_new(&mut self) -> Result<ChatReport, SyncError> {
        let sink = self.sink()?;
        let channel = self
            .settings
            .channel
            .clone()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| SyncError::Config("slack.channel is not set".to_string()))?;

        let mut report = ChatReport::default();
        let mut questions = self.store.tracked_questions(self.settings.questions_to_watch)?;
        if questions.is_empty() {
            info!("No questions to post");
            return Ok(report);
        }
        questions.reverse();

        for question in questions {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            if self.store.find_chat_link(question.id)?.is_some() {
                debug!(question_id = question.id, "Question already posted");
                report.already_linked += 1;
                continue;
            }

            let user = self.owner(&question)?;
            let message =
                projector::render(&question, user.as_ref(), self.settings.team_icon.as_deref());

            let posted = match sink.post(&channel, &message).await {
                Ok(posted) => posted,
                Err(e) => {
                    error!(question_id = question.id, error = %e, "Failed to post question");
                    report.errors.push(format!("post {}: {e}", question.id));
                    break;
                }
            };

            let link = ChatLink {
                question_id: question.id,
                channel: posted.channel,
                ts: posted.ts,
            };
            if let Err(e) = self.store.create_chat_link(&link) {
                error!(question_id = question.id, error = %e, "Failed to store chat link");
                report.errors.push(format!("link {}: {e}", question.id));
                break;
            }

            info!(question_id = question.id, channel = %link.channel, title = %question.title, "Question posted");
            report.posted += 1;
        }

        Ok(report)
    }

    /// Refresh every linked message; retire the ones outside the window.
    ///
    /// Retirement sends a stripped message, then drops the question and its
    /// link whether or not Slack accepted the update.
    pub async fn update_tracked(&mut self) -> Result<ChatReport, SyncError> {
        let sink = self.sink()?;
        let mut report = ChatReport::default();

        let links = self.store.all_chat_links()?;
        if links.is_empty() {
            debug!("No chat messages to update");
            return Ok(report);
        }

        let window: HashSet<i64> = self
            .store
            .tracked_ids(self.settings.questions_to_watch)?
            .into_iter()
            .collect();

        for link in links {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let Some(question) = self.store.find_question(link.question_id)? else {
                warn!(question_id = link.question_id, "Chat link without question, dropping");
                self.store.delete_chat_link(link.question_id)?;
                report.dangling += 1;
                continue;
            };

            if window.contains(&question.id) {
                let user = self.owner(&question)?;
                let message = projector::render(
                    &question,
                    user.as_ref(),
                    self.settings.team_icon.as_deref(),
                );
                match sink.update(&link.channel, &link.ts, &message).await {
                    Ok(_) => {
                        debug!(question_id = question.id, "Chat message updated");
                        report.updated += 1;
                    }
                    Err(e) => {
                        warn!(question_id = question.id, error = %e, "Failed to update chat message");
                        report.errors.push(format!("update {}: {e}", question.id));
                    }
                }
            } else {
                let message = projector::render_retired(&question);
                if let Err(e) = sink.update(&link.channel, &link.ts, &message).await {
                    warn!(question_id = question.id, error = %e, "Failed to send retirement update");
                    report.errors.push(format!("retire {}: {e}", question.id));
                }
                self.store.delete_question(question.id)?;
                self.store.delete_chat_link(question.id)?;
                info!(question_id = question.id, title = %question.title, "Question no longer tracked");
                report.retired += 1;
            }
        }

        Ok(report)
    }

    /// Run all passes in order. Slack passes are skipped when Slack is disabled.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        match self.sync_new().await {
            Ok(r) => report.new_questions = r,
            Err(e) => report.failures.push(format!("sync new: {e}")),
        }

        if !self.cancel.is_cancelled() {
            match self.sync_updates().await {
                Ok(r) => report.updates = r,
                Err(e) => report.failures.push(format!("sync updates: {e}")),
            }
        }

        if !self.settings.slack_enabled {
            debug!("Slack disabled, skipping chat passes");
            report.chat_skipped = true;
        } else if !self.cancel.is_cancelled() {
            match self.post_new().await {
                Ok(r) => report.posts = r,
                Err(e) => report.failures.push(format!("post new: {e}")),
            }
            if !self.cancel.is_cancelled() {
                match self.update_tracked().await {
                    Ok(r) => report.chat_updates = r,
                    Err(e) => report.failures.push(format!("update tracked: {e}")),
                }
            }
        }

        report.watermark = self.watermark;
        report.quota = self.source.quota();
        report
    }

    fn sink(&self) -> Result<Arc<dyn ChatSink>, SyncError> {
        self.sink
            .clone()
            .ok_or_else(|| SyncError::Config("slack is not configured".to_string()))
    }

    fn owner(&self, question: &QuestionRecord) -> Result<Option<UserRecord>, StoreError> {
        match question.user_id {
            Some(id) => self.store.find_user(id),
            None => Ok(None),
        }
    }

    /// Store the owner, then the question.
    fn persist(&self, item: &QuestionItem, report: &mut SyncReport) -> Result<(), StoreError> {
        if let Some(user) = UserRecord::from_wire(&item.owner) {
            if self.store.upsert_user(&user)?.is_write() {
                report.users_written += 1;
            }
        }
        let record = QuestionRecord::from_wire(item, &self.settings.site);
        let outcome = self.store.upsert_question(&record)?;
        debug!(question_id = record.id, ?outcome, "Question stored");
        report.record(outcome);
        Ok(())
    }

    async fn fetch_page(&self, query: &mut Query, report: &mut SyncReport) -> Fetched {
        if self.cancel.is_cancelled() {
            report.cancelled = true;
            return Fetched::Aborted;
        }
        if query.paging.current_page() > MAX_PAGES {
            debug!(max = MAX_PAGES, "Page ceiling reached");
            return Fetched::Ceiling;
        }

        match self.source.fetch(query).await {
            Ok(envelope) => {
                report.pages += 1;
                report.fetched += envelope.items.len();
                if let Some(backoff) = envelope.backoff {
                    report.backoff_secs = Some(backoff);
                }
                Fetched::Page(envelope)
            }
            Err(e) => {
                error!(page = query.paging.current_page(), error = %e, "Failed to fetch questions");
                report.errors.push(e.to_string());
                Fetched::Aborted
            }
        }
    }

    fn commit_watermark(&mut self, candidate: Option<DateTime<Utc>>) {
        if let Some(candidate) = candidate {
            self.watermark = Some(self.watermark.map_or(candidate, |w| w.max(candidate)));
        }
    }
}

/// Move to the next page. `false` when the query is exhausted or the API
/// asked us to back off.
fn advance(query: &mut Query, report: &SyncReport) -> bool {
    if report.backoff_secs.is_some() {
        warn!("Stopping pagination on API backoff");
        return false;
    }
    if !query.paging.has_more() {
        return false;
    }
    query.paging.next_page();
    true
}

pub(crate) fn apply_overrides(query: &mut Query, overrides: &BTreeMap<String, String>) {
    for (name, value) in overrides {
        query.parameters.set(name, value);
    }
}
