//! Selection handed to the photo gallery.

use evpix_models::ClusterId;
use serde::Serialize;
use url::Url;

use crate::selection::Selection;

/// Query parameter the gallery filters on. Repeated once per cluster.
pub const GALLERY_FILTER_PARAM: &str = "cluster_list_id";

/// Cluster ids the gallery should restrict its photos to.
///
/// An empty filter means "all photos".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GalleryFilter {
    pub cluster_list_id: Vec<ClusterId>,
}

impl GalleryFilter {
    pub fn from_selection(selection: &Selection) -> Self {
        Self {
            cluster_list_id: selection.to_vec(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cluster_list_id.is_empty()
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        self.cluster_list_id
            .iter()
            .map(|id| (GALLERY_FILTER_PARAM, id.to_string()))
            .collect()
    }

    /// Replace any existing gallery filter parameters on `url`.
    pub fn apply_to(&self, url: &mut Url) {
        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != GALLERY_FILTER_PARAM)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        pairs.extend(
            self.query_pairs()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v)),
        );

        if pairs.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(pairs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_pairs_sorted_and_repeated() {
        let filter =
            GalleryFilter::from_selection(&Selection::from_ids([ClusterId(7), ClusterId(2)]));
        assert_eq!(
            filter.query_pairs(),
            vec![("cluster_list_id", "2".to_string()), ("cluster_list_id", "7".to_string())]
        );
    }

    #[test]
    fn test_apply_replaces_previous_filter() {
        let mut url =
            Url::parse("https://api.example.com/photos?event_code=E1&cluster_list_id=99").unwrap();
        let filter = GalleryFilter::from_selection(&Selection::from_ids([ClusterId(3)]));
        filter.apply_to(&mut url);
        assert_eq!(url.query(), Some("event_code=E1&cluster_list_id=3"));

        GalleryFilter::default().apply_to(&mut url);
        assert_eq!(url.query(), Some("event_code=E1"));
    }
}
