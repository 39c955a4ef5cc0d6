//! Read-only polling of the question feed.
//!
//! Nothing is stored or posted; `since` only lives in memory.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use stackexchange::{Query, QuestionItem};
use tracing::{debug, warn};

use crate::engine::{apply_overrides, EngineSettings, MAX_PAGES};
use crate::source::QuestionSource;

pub const WATCH_INTERVAL: Duration = Duration::from_secs(60);

/// How far back the first poll looks.
pub fn initial_lookback() -> TimeDelta {
    TimeDelta::minutes(30)
}

#[derive(Debug, Clone)]
pub struct WatchState {
    site: String,
    overrides: BTreeMap<String, String>,
    since: DateTime<Utc>,
}

impl WatchState {
    pub fn new(settings: &EngineSettings, now: DateTime<Utc>) -> Self {
        Self {
            site: settings.site.clone(),
            overrides: settings.search_overrides.clone(),
            since: now - initial_lookback(),
        }
    }

    /// Creation time of the newest question seen so far.
    pub fn since(&self) -> DateTime<Utc> {
        self.since
    }

    /// Questions created after `since`, oldest first. Advances `since` past
    /// everything returned.
    pub async fn poll(
        &mut self,
        source: &dyn QuestionSource,
    ) -> Result<Vec<QuestionItem>, stackexchange::Error> {
        let mut query = self.query(source);
        let mut items = Vec::new();

        while query.paging.current_page() <= MAX_PAGES {
            let envelope = source.fetch(&mut query).await?;
            items.extend(envelope.items);

            if envelope.backoff.is_some() {
                warn!(backoff = ?envelope.backoff, "Stopping watch poll on API backoff");
                break;
            }
            if !query.paging.has_more() {
                break;
            }
            query.paging.next_page();
        }

        items.sort_by_key(|item| (item.creation_date, item.question_id));
        items.dedup_by_key(|item| item.question_id);
        if let Some(newest) = items.last() {
            self.since = self.since.max(newest.created_at());
        }
        debug!(count = items.len(), since = %self.since, "Watch poll finished");
        Ok(items)
    }

    /// Query the next poll will send.
    pub fn query(&self, source: &dyn QuestionSource) -> Query {
        let mut query = source.search_advanced();
        apply_overrides(&mut query, &self.overrides);
        query.parameters.set("site", self.site.as_str());
        query
            .parameters
            .set("fromdate", (self.since + TimeDelta::seconds(1)).timestamp());
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockQuestionSource;
    use stackexchange::{epoch, QuestionsEnvelope, Quota};
    use std::sync::{Arc, Mutex};

    fn item(id: i64, created: i64) -> QuestionItem {
        QuestionItem {
            question_id: id,
            title: format!("question {id}"),
            creation_date: created,
            ..Default::default()
        }
    }

    fn source(pages: Vec<QuestionsEnvelope>, fromdates: Arc<Mutex<Vec<String>>>) -> MockQuestionSource {
        let pages = Arc::new(Mutex::new(pages));
        let mut source = MockQuestionSource::new();
        source
            .expect_search_advanced()
            .returning(|| Query::search_advanced(None));
        source.expect_quota().returning(Quota::default);
        source.expect_fetch().returning(move |query| {
            fromdates
                .lock()
                .unwrap()
                .push(query.parameters.value_of("fromdate"));
            let page = pages.lock().unwrap().remove(0);
            query.paging.record(page.has_more);
            Ok(page)
        });
        source
    }

    #[tokio::test]
    async fn test_starts_thirty_minutes_back() {
        let now = epoch(1_700_000_000);
        let fromdates = Arc::new(Mutex::new(Vec::new()));
        let source = source(vec![QuestionsEnvelope::default()], Arc::clone(&fromdates));

        let mut state = WatchState::new(&EngineSettings::default(), now);
        let items = state.poll(&source).await.unwrap();

        assert!(items.is_empty());
        assert_eq!(state.since(), now - initial_lookback());
        assert_eq!(
            fromdates.lock().unwrap()[0],
            (1_700_000_000 - 30 * 60 + 1).to_string()
        );
    }

    #[tokio::test]
    async fn test_pages_and_advances() {
        let now = epoch(1_700_000_000);
        let fromdates = Arc::new(Mutex::new(Vec::new()));
        let pages = vec![
            QuestionsEnvelope {
                items: vec![item(3, 1_699_999_900), item(2, 1_699_999_800)],
                has_more: true,
                ..Default::default()
            },
            QuestionsEnvelope {
                items: vec![item(1, 1_699_999_700)],
                ..Default::default()
            },
            QuestionsEnvelope::default(),
        ];
        let source = source(pages, Arc::clone(&fromdates));

        let mut state = WatchState::new(&EngineSettings::default(), now);
        let items = state.poll(&source).await.unwrap();
        let ids: Vec<i64> = items.iter().map(|i| i.question_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(state.since(), epoch(1_699_999_900));

        state.poll(&source).await.unwrap();
        assert_eq!(
            fromdates.lock().unwrap().last().cloned(),
            Some("1699999901".to_string())
        );
    }

    #[tokio::test]
    async fn test_fetch_error_keeps_since() {
        let now = epoch(1_700_000_000);
        let mut source = MockQuestionSource::new();
        source
            .expect_search_advanced()
            .returning(|| Query::search_advanced(None));
        source.expect_fetch().returning(|_| {
            Err(stackexchange::Error::Status {
                status: 502,
                body: String::new(),
            })
        });

        let mut state = WatchState::new(&EngineSettings::default(), now);
        assert!(state.poll(&source).await.is_err());
        assert_eq!(state.since(), now - initial_lookback());
    }
}
