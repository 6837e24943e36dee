//! One page of an S3-style `ListBucketResult` listing.

use super::{
    bucket::BucketEndpoint,
    object::{ObjectRecord, parse_size},
};

/// A raw `Contents` entry. Absent subelements are empty strings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListingEntry {
    pub key: String,
    pub last_modified: String,
    pub etag: String,
    pub size: String,
    pub storage_class: String,
    pub owner_id: String,
    pub owner_display_name: String,
    pub kind: String,
}

impl ListingEntry {
    /// Shorthand for an entry that only carries a key.
    #[cfg(test)]
    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    /// Build the candidate record for this entry.
    pub fn to_record(&self, endpoint: &BucketEndpoint) -> ObjectRecord {
        ObjectRecord {
            bucket_url: endpoint.url().to_string(),
            bucket_name: endpoint.name().to_string(),
            key: self.key.clone(),
            last_modified: self.last_modified.clone(),
            etag: self.etag.clone(),
            size: parse_size(&self.size),
            storage_class: self.storage_class.clone(),
            owner_id: self.owner_id.clone(),
            owner_display_name: self.owner_display_name.clone(),
            kind: self.kind.clone(),
        }
    }
}

/// A fetched and parsed listing page. Consumed immediately by the crawler.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Page {
    /// Entries in document order.
    pub entries: Vec<ListingEntry>,

    /// `IsTruncated`: more results exist after this page.
    pub is_truncated: bool,

    /// `NextMarker`, when present and non-empty.
    pub next_marker: Option<String>,
}

impl Page {
    /// Cursor for the page after this one.
    ///
    /// Prefers `NextMarker`, falling back to the last entry's key as S3
    /// listing v1 allows. Returns `None` when neither yields a value.
    pub fn continuation_marker(&self) -> Option<String> {
        if let Some(marker) = self.next_marker.as_ref().filter(|m| !m.is_empty()) {
            return Some(marker.clone());
        }
        self.entries
            .last()
            .map(|entry| entry.key.clone())
            .filter(|key| !key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_marker_wins_over_last_key() {
        let page = Page {
            entries: vec![ListingEntry::with_key("a"), ListingEntry::with_key("b")],
            is_truncated: true,
            next_marker: Some("z".into()),
        };
        assert_eq!(page.continuation_marker().as_deref(), Some("z"));
    }

    #[test]
    fn falls_back_to_last_key() {
        let page = Page {
            entries: vec![ListingEntry::with_key("a"), ListingEntry::with_key("b")],
            is_truncated: true,
            next_marker: None,
        };
        assert_eq!(page.continuation_marker().as_deref(), Some("b"));
    }

    #[test]
    fn empty_page_has_no_marker() {
        let page = Page {
            entries: vec![],
            is_truncated: true,
            next_marker: Some(String::new()),
        };
        assert_eq!(page.continuation_marker(), None);
    }

    #[test]
    fn record_carries_endpoint_and_parsed_size() {
        let endpoint = BucketEndpoint::parse("https://host/envicloud/").unwrap();
        let entry = ListingEntry {
            key: "chelsa/tas.tif".into(),
            size: "2048".into(),
            kind: "Normal".into(),
            ..ListingEntry::default()
        };
        let record = entry.to_record(&endpoint);
        assert_eq!(record.bucket_url, "https://host/envicloud/");
        assert_eq!(record.bucket_name, "envicloud");
        assert_eq!(record.size, 2048);
        assert_eq!(record.kind, "Normal");
    }
}
