//! Question queries: advanced search and questions by ids.

use url::Url;

use crate::paging::Paging;
use crate::parameters::Parameters;

/// Custom filter adding share links, vote and comment counts to questions.
///
/// See <https://api.stackexchange.com/docs/filters>.
pub const DEFAULT_FILTER: &str = "!6hYwbNNZ(*eH3a3)XT0aZCOGTo-kwAtAoVF5vC378NPI6Y";

/// Id substituted when a questions-by-ids query has no ids, so the path is
/// never malformed.
pub const PLACEHOLDER_QUESTION_ID: i64 = 100;

/// Which endpoint a [`Query`] targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKind {
    /// `/search/advanced`
    SearchAdvanced,
    /// `/questions/{ids}`
    Questions { ids: Vec<i64> },
}

/// A paged request against one endpoint.
#[derive(Debug, Clone)]
pub struct Query {
    pub kind: QueryKind,
    pub parameters: Parameters,
    pub paging: Paging,
}

impl Query {
    /// <https://api.stackexchange.com/docs/advanced-search>
    #[must_use]
    pub fn search_advanced(api_key: Option<&str>) -> Self {
        let mut parameters = Parameters::new();
        parameters
            .allow("site", "stackoverflow", "site where to check questions from")
            .allow(
                "q",
                "",
                "a free form text parameter, will match all question properties based on an undocumented algorithm",
            )
            .allow(
                "accepted",
                "",
                "true to return only questions with accepted answers, false to return only those without",
            )
            .allow("answers", "", "the minimum number of answers returned questions must have")
            .allow("body", "", "text which must appear in returned questions' bodies")
            .allow(
                "closed",
                "",
                "true to return only closed questions, false to return only open ones",
            )
            .allow(
                "migrated",
                "",
                "true to return only questions migrated away from a site, false to return only those not",
            )
            .allow(
                "notice",
                "",
                "true to return only questions with post notices, false to return only those without",
            )
            .allow(
                "nottagged",
                "",
                "a semicolon delimited list of tags, none of which will be present on returned questions",
            )
            .allow(
                "tagged",
                "",
                "a semicolon delimited list of tags, of which at least one will be present on all returned questions",
            )
            .allow("title", "", "text which must appear in returned questions titles")
            .allow("user", "", "the id of the user who must own the questions returned")
            .allow("url", "", "a url which must be contained in a post, may include a wildcard")
            .allow("views", "", "the minimum number of views returned questions must have")
            .allow(
                "wiki",
                "",
                "true to return only community wiki questions, false to return only non-community wiki ones",
            )
            .allow(
                "sort",
                "creation",
                "sort field: activity, creation, votes, relevance",
            )
            .allow("order", "asc", "order results ascending or descending")
            .allow("fromdate", "", "from which date to search")
            .allow("todate", "", "up to which date to search")
            .allow("filter", DEFAULT_FILTER, "custom response filter")
            .allow("pagesize", 100_i64, "page size, any value between 0 and 100")
            .allow("page", 1_i64, "current page to be fetched")
            .allow(
                "key",
                api_key.unwrap_or_default(),
                "app key, grants a higher request quota",
            );

        Self {
            kind: QueryKind::SearchAdvanced,
            parameters,
            paging: Paging::default(),
        }
    }

    /// <https://api.stackexchange.com/docs/questions-by-ids>
    #[must_use]
    pub fn questions(ids: &[i64], api_key: Option<&str>) -> Self {
        let mut parameters = Parameters::new();
        parameters
            .allow("site", "stackoverflow", "site where to check questions from")
            .allow("sort", "activity", "sort field: activity, creation, votes")
            .allow("order", "asc", "order results ascending or descending")
            .allow("fromdate", "", "from which date to search")
            .allow("todate", "", "up to which date to search")
            .allow("filter", DEFAULT_FILTER, "custom response filter")
            .allow("pagesize", 100_i64, "page size, any value between 0 and 100")
            .allow("page", 1_i64, "current page to be fetched")
            .allow(
                "min",
                "",
                "lower bound of the field selected by sort",
            )
            .allow(
                "max",
                "",
                "upper bound of the field selected by sort",
            )
            .allow(
                "key",
                api_key.unwrap_or_default(),
                "app key, grants a higher request quota",
            );

        Self {
            kind: QueryKind::Questions { ids: ids.to_vec() },
            parameters,
            paging: Paging::default(),
        }
    }

    /// Endpoint path relative to `{host}/{version}/`.
    #[must_use]
    pub fn path(&self) -> String {
        match &self.kind {
            QueryKind::SearchAdvanced => "search/advanced".to_string(),
            QueryKind::Questions { ids } => {
                let ids = if ids.is_empty() {
                    PLACEHOLDER_QUESTION_ID.to_string()
                } else {
                    ids.iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(";")
                };
                format!("questions/{ids}")
            }
        }
    }

    /// Build the request URL: defaults applied, current page written into `page`.
    pub fn url(&mut self, api_host: &str, api_version: &str) -> Result<Url, url::ParseError> {
        self.parameters.apply_defaults();
        self.parameters.set("page", self.paging.current_page());

        let mut url = Url::parse(&format!(
            "{}/{}/{}",
            api_host.trim_end_matches('/'),
            api_version.trim_matches('/'),
            self.path()
        ))?;

        {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in self.parameters.applied() {
                pairs.append_pair(name, &value.to_string());
            }
        }

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_value(url: &Url, name: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn test_search_advanced_url() {
        let mut query = Query::search_advanced(None);
        query.parameters.set("tagged", "aframe");
        query.parameters.set("fromdate", 1_500_000_001_i64);

        let url = query
            .url("https://api.stackexchange.com", "2.3")
            .unwrap();

        assert_eq!(url.path(), "/2.3/search/advanced");
        assert_eq!(query_value(&url, "tagged").as_deref(), Some("aframe"));
        assert_eq!(query_value(&url, "fromdate").as_deref(), Some("1500000001"));
        assert_eq!(query_value(&url, "sort").as_deref(), Some("creation"));
        assert_eq!(query_value(&url, "order").as_deref(), Some("asc"));
        assert_eq!(query_value(&url, "pagesize").as_deref(), Some("100"));
        assert_eq!(query_value(&url, "page").as_deref(), Some("1"));
        assert!(query_value(&url, "key").is_none());
    }

    #[test]
    fn test_page_follows_cursor() {
        let mut query = Query::search_advanced(Some("secret"));
        query.paging.next_page();
        query.paging.next_page();

        let url = query.url("https://api.stackexchange.com/", "2.3").unwrap();
        assert_eq!(query_value(&url, "page").as_deref(), Some("3"));
        assert_eq!(query_value(&url, "key").as_deref(), Some("secret"));
    }

    #[test]
    fn test_questions_path_joins_ids() {
        let query = Query::questions(&[3, 1, 2], None);
        assert_eq!(query.path(), "questions/3;1;2");
    }

    #[test]
    fn test_empty_ids_use_placeholder() {
        let mut query = Query::questions(&[], None);
        let url = query.url("https://api.stackexchange.com", "2.3").unwrap();
        assert_eq!(url.path(), "/2.3/questions/100");
        assert_eq!(query_value(&url, "sort").as_deref(), Some("activity"));
    }

    #[test]
    fn test_unknown_config_keys_are_ignored() {
        let mut query = Query::questions(&[1], None);
        query.parameters.set("tagged", "aframe");
        let url = query.url("https://api.stackexchange.com", "2.3").unwrap();
        assert!(query_value(&url, "tagged").is_none());
    }
}
