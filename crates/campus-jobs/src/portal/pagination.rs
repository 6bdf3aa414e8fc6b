use serde::{Deserialize, Serialize};

/// `?page=` query parameter shared by every list endpoint.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page: Option<usize>,
}

impl PageRequest {
    pub fn number(page: usize) -> Self {
        Self { page: Some(page) }
    }
}

/// One page of an ordered result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub count: usize,
    pub page: usize,
    pub page_size: usize,
    pub next: Option<usize>,
    pub previous: Option<usize>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Slice `items` into the requested page. Pages are 1-based; a page past
    /// the end clamps to the last page, and an empty set yields page 1.
    pub fn paginate(items: Vec<T>, request: PageRequest, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let count = items.len();
        let last = count.div_ceil(page_size).max(1);
        let page = request.page.unwrap_or(1).clamp(1, last);

        let results = items
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();

        Self {
            count,
            page,
            page_size,
            next: (page < last).then_some(page + 1),
            previous: (page > 1).then(|| page - 1),
            results,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            page: self.page,
            page_size: self.page_size,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}
