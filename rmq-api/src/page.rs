//! Paging and name filtering for list endpoints.
//!
//! The queue, exchange, connection and channel lists accept `page`,
//! `page_size`, `name` and `use_regex`. Defaults are left out of the query.

use rmq_web::Query;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFilter {
    pub page: u32,
    pub page_size: u32,
    pub name: String,
    pub use_regex: bool,
}

impl Default for PageFilter {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            name: String::new(),
            use_regex: false,
        }
    }
}

impl PageFilter {
    /// A page without a name filter.
    pub fn new_page(page: i64, page_size: i64) -> Self {
        Self::new_page_filter(page, page_size, "", false)
    }

    /// A page with a name filter. Pages below 1 become 1, sizes below 1 become 100.
    pub fn new_page_filter(
        page: i64,
        page_size: i64,
        name: impl Into<String>,
        use_regex: bool,
    ) -> Self {
        Self {
            page: clamp(page, DEFAULT_PAGE),
            page_size: clamp(page_size, DEFAULT_PAGE_SIZE),
            name: name.into(),
            use_regex,
        }
    }

    /// The query for this page, or `None` when every value is a default.
    pub fn to_query(&self) -> Option<Query> {
        let mut query = Query::new();
        query
            .add_if(self.page > 1, "page", self.page.to_string())
            .add_if(
                self.page_size > 0 && self.page_size != DEFAULT_PAGE_SIZE,
                "page_size",
                self.page_size.to_string(),
            )
            .add_if(!self.name.is_empty(), "name", self.name.as_str())
            .add_if(!self.name.is_empty() && self.use_regex, "use_regex", "true");
        (!query.is_empty()).then_some(query)
    }

    /// The query string with its leading `?`, or `""` for the default page.
    pub fn to_url_suffix(&self) -> String {
        self.to_query()
            .map(|q| q.query_string())
            .unwrap_or_default()
    }
}

fn clamp(value: i64, default: u32) -> u32 {
    if value < 1 {
        default
    } else {
        u32::try_from(value).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_omitted() {
        assert!(PageFilter::default().to_query().is_none());
        assert_eq!(PageFilter::new_page(0, 0), PageFilter::default());
        assert_eq!(PageFilter::new_page(1, 100).to_url_suffix(), "");
    }

    #[test]
    fn test_clamping() {
        let page = PageFilter::new_page(-3, -1);
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 100);
    }

    #[test]
    fn test_page_and_size() {
        assert_eq!(PageFilter::new_page(2, 100).to_url_suffix(), "?page=2");
        assert_eq!(PageFilter::new_page(1, 50).to_url_suffix(), "?page_size=50");
        assert_eq!(
            PageFilter::new_page(3, 25).to_url_suffix(),
            "?page=3&page_size=25"
        );
    }

    #[test]
    fn test_regex_needs_name() {
        let without_name = PageFilter::new_page_filter(1, 100, "", true);
        assert!(without_name.to_query().is_none());

        let with_name = PageFilter::new_page_filter(1, 100, "orders.*", true);
        assert_eq!(with_name.to_url_suffix(), "?name=orders.%2A&use_regex=true");

        let plain_name = PageFilter::new_page_filter(1, 100, "a b", false);
        assert_eq!(plain_name.to_url_suffix(), "?name=a+b");
    }
}
