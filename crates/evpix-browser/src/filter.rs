//! Selection persisted in a URL query parameter.
//!
//! The selection is stored as comma-separated cluster ids, e.g.
//! `?faceFilter=2,5,9`. Reading is lenient: values that are not integers,
//! duplicates and sentinel ids are dropped. An empty selection removes the
//! parameter instead of writing an empty value.

use std::collections::BTreeMap;

use evpix_models::ClusterId;
use tracing::debug;
use url::Url;

use crate::config::DEFAULT_FILTER_PARAM;
use crate::error::BrowserResult;
use crate::selection::Selection;

/// Key/value view of a query string.
pub trait QueryState: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&mut self, name: &str, value: &str);
    fn remove(&mut self, name: &str);
}

/// Query state held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryQuery {
    params: BTreeMap<String, String>,
}

impl MemoryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl QueryState for MemoryQuery {
    fn get(&self, name: &str) -> Option<String> {
        self.params.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: &str) {
        self.params.insert(name.to_string(), value.to_string());
    }

    fn remove(&mut self, name: &str) {
        self.params.remove(name);
    }
}

/// Query state backed by a page URL. Other parameters are preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlQuery {
    url: Url,
}

impl UrlQuery {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    pub fn parse(url: &str) -> BrowserResult<Self> {
        Ok(Self::new(Url::parse(url)?))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn into_url(self) -> Url {
        self.url
    }

    fn rewrite(&mut self, name: &str, value: Option<&str>) {
        let mut pairs: Vec<(String, String)> = self
            .url
            .query_pairs()
            .filter(|(k, _)| k != name)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if let Some(value) = value {
            pairs.push((name.to_string(), value.to_string()));
        }

        if pairs.is_empty() {
            self.url.set_query(None);
        } else {
            self.url.query_pairs_mut().clear().extend_pairs(pairs);
        }
    }
}

impl QueryState for UrlQuery {
    fn get(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    fn set(&mut self, name: &str, value: &str) {
        self.rewrite(name, Some(value));
    }

    fn remove(&mut self, name: &str) {
        self.rewrite(name, None);
    }
}

/// Parse a comma-separated id list into a selection.
pub fn parse_filter(value: &str) -> Selection {
    let ids = value.split(',').filter_map(|part| {
        let parsed = part.parse::<ClusterId>().ok();
        if parsed.is_none() && !part.trim().is_empty() {
            debug!(value = part, "Dropping invalid cluster id from filter");
        }
        parsed
    });
    Selection::from_ids(ids)
}

/// Serialize a selection, or `None` when it is empty.
pub fn format_filter(selection: &Selection) -> Option<String> {
    if selection.is_empty() {
        return None;
    }
    let ids: Vec<String> = selection.ids().map(|id| id.to_string()).collect();
    Some(ids.join(","))
}

/// Moves a selection between memory and query state.
#[derive(Debug, Clone)]
pub struct FilterSynchronizer {
    param: String,
}

impl Default for FilterSynchronizer {
    fn default() -> Self {
        Self::new(DEFAULT_FILTER_PARAM)
    }
}

impl FilterSynchronizer {
    pub fn new(param: impl Into<String>) -> Self {
        Self {
            param: param.into(),
        }
    }

    pub fn param(&self) -> &str {
        &self.param
    }

    /// Read the selection. A missing parameter yields an empty selection.
    pub fn load(&self, query: &dyn QueryState) -> Selection {
        query
            .get(&self.param)
            .map(|value| parse_filter(&value))
            .unwrap_or_default()
    }

    /// Write the selection, removing the parameter when it is empty.
    pub fn persist(&self, selection: &Selection, query: &mut dyn QueryState) {
        match format_filter(selection) {
            Some(value) => query.set(&self.param, &value),
            None => query.remove(&self.param),
        }
    }

    /// Persist the selection and return what now reads back from the query.
    /// Applying the same selection again leaves the query unchanged.
    pub fn apply(&self, selection: &Selection, query: &mut dyn QueryState) -> Selection {
        self.persist(selection, query);
        self.load(query)
    }
}
