use serde::{Deserialize, Serialize};

use crate::{
    constants::MAX_PAGE_SIZE,
    error::{Error, HtmlError},
    form::QueryParams,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: i64,
    pub page_size: i64,
}

impl PageParams {
    /// Reads `page` and `page_size`. A malformed page number, or one whose
    /// offset does not fit an i64, is a 404. A malformed page size falls back
    /// to the default.
    pub fn from_query(query: &QueryParams, default_size: i64) -> Result<Self, Error> {
        let page_size = query
            .get("page_size")
            .and_then(|size| size.parse::<i64>().ok())
            .filter(|size| *size >= 1)
            .map(|size| size.min(MAX_PAGE_SIZE))
            .unwrap_or(default_size);

        let page = match query.get("page") {
            None => 1,
            Some(page) => page
                .parse::<i64>()
                .ok()
                .filter(|page| *page >= 1)
                .filter(|page| (page - 1).checked_mul(page_size).is_some())
                .ok_or_else(|| HtmlError::NotFound.new("Invalid page."))?,
        };

        Ok(Self { page, page_size })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// `path` and `query` describe the current request and are reused to
    /// build the neighbouring page links.
    pub fn from_rows(
        rows: Vec<T>,
        total_rows: i64,
        params: &PageParams,
        path: &str,
        query: &QueryParams,
    ) -> Result<Self, Error> {
        if rows.is_empty() && params.page > 1 {
            return Err(HtmlError::NotFound.new("Invalid page."));
        }

        let link = |page: i64| {
            let query = if page == 1 {
                query.with("page", None)
            } else {
                query.with("page", Some(page.to_string().as_str()))
            };
            if query.is_empty() {
                path.to_owned()
            } else {
                format!("{path}?{query}")
            }
        };

        let next = (params.page.saturating_mul(params.page_size) < total_rows)
            .then(|| link(params.page + 1));
        let previous = (params.page > 1).then(|| link(params.page - 1));

        Ok(Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        })
    }

    pub fn no_rows() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(raw: &str) -> PageParams {
        PageParams::from_query(&QueryParams::parse(raw), 6).unwrap()
    }

    #[test]
    fn defaults_and_caps() {
        assert_eq!(params(""), PageParams { page: 1, page_size: 6 });
        assert_eq!(params("page_size=abc").page_size, 6);
        assert_eq!(params("page_size=5000").page_size, MAX_PAGE_SIZE);
        assert_eq!(params("page=3&page_size=10").offset(), 20);
    }

    #[test]
    fn malformed_page_is_not_found() {
        for raw in ["page=0", "page=-1", "page=x"] {
            let error = PageParams::from_query(&QueryParams::parse(raw), 6)
                .err()
                .unwrap();
            assert_eq!(error.code, 404);
        }
    }

    #[test]
    fn page_past_the_offset_range_is_not_found() {
        let raw = format!("page={}&page_size=1000", i64::MAX);
        let error = PageParams::from_query(&QueryParams::parse(&raw), 6)
            .err()
            .unwrap();
        assert_eq!(error.code, 404);
        assert_eq!(error.body(), serde_json::json!({"detail": "Invalid page."}));

        let raw = format!("page={}&page_size=1", i64::MAX);
        let params = params(&raw);
        assert_eq!(params.offset(), i64::MAX - 1);
        let page = Page::<i32>::from_rows(vec![1], 5, &params, "/api/users/", &QueryParams::parse(&raw))
            .unwrap();
        assert!(page.next.is_none());
    }

    #[test]
    fn links_keep_other_parameters() {
        let query = QueryParams::parse("page=2&page_size=2&author=1");
        let params = PageParams::from_query(&query, 6).unwrap();
        let page = Page::from_rows(vec![3, 4], 5, &params, "/api/recipes/", &query).unwrap();

        assert_eq!(page.count, 5);
        assert_eq!(
            page.next.as_deref(),
            Some("/api/recipes/?page_size=2&author=1&page=3")
        );
        assert_eq!(
            page.previous.as_deref(),
            Some("/api/recipes/?page_size=2&author=1")
        );
    }

    #[test]
    fn last_page_has_no_next() {
        let query = QueryParams::parse("page=3&page_size=2");
        let params = PageParams::from_query(&query, 6).unwrap();
        let page = Page::from_rows(vec![5], 5, &params, "/api/users/", &query).unwrap();

        assert!(page.next.is_none());
        assert!(page.previous.is_some());
    }

    #[test]
    fn empty_first_page_is_fine_but_past_the_end_is_not() {
        let query = QueryParams::default();
        let first = Page::<i32>::from_rows(vec![], 0, &params(""), "/api/users/", &query).unwrap();
        assert_eq!(first, Page::no_rows());

        let error = Page::<i32>::from_rows(vec![], 0, &params("page=2"), "/api/users/", &query)
            .err()
            .unwrap();
        assert_eq!(error.code, 404);
    }
}
