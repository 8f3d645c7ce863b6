//! Paged table requests

use super::filters::FilterExpression;
use crate::api::constants::DEFAULT_PAGE_SIZE;

/// Caller-facing options for a table fetch
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub filter: Option<FilterExpression>,
    pub page_size: usize,
    /// Starting offset
    pub skip: usize,
    /// Keep paging until a short or empty page; otherwise a single page
    pub all_records: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            filter: None,
            page_size: DEFAULT_PAGE_SIZE,
            skip: 0,
            all_records: true,
        }
    }
}

impl FetchOptions {
    pub fn filter(mut self, filter: FilterExpression) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn single_page(mut self) -> Self {
        self.all_records = false;
        self
    }
}

/// One page request; a new value is built for every page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub table: String,
    pub skip: usize,
    pub page_size: usize,
    /// Already percent-encoded `$filter` value
    pub encoded_filter: Option<String>,
}

impl FetchRequest {
    /// Build the full request URL
    ///
    /// The query string is assembled by hand so the pre-encoded filter is
    /// sent byte for byte.
    pub fn to_url(&self, base_url: &str) -> String {
        let mut url = format!(
            "{}/{}?$skip={}&$top={}",
            base_url.trim_end_matches('/'),
            urlencoding::encode(&self.table),
            self.skip,
            self.page_size
        );
        if let Some(filter) = &self.encoded_filter {
            url.push_str("&$filter=");
            url.push_str(filter);
        }
        url
    }

    /// Request for the page following one that returned `received` records
    pub fn next(&self, received: usize) -> Self {
        Self {
            skip: self.skip + received,
            ..self.clone()
        }
    }
}
