/// Page-number pagination shared by every list endpoint
use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

/// Query parameters `?page=&per_page=`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PageParams {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }.normalized()
    }

    /// Clamp to `page >= 1` and `1 <= per_page <= MAX_PER_PAGE`
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn limit(&self) -> i64 {
        self.normalized().per_page as i64
    }

    pub fn offset(&self) -> i64 {
        let p = self.normalized();
        (p.page as i64 - 1) * p.per_page as i64
    }
}

/// Paginated response payload: `{data, page, per_page, total}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, params: PageParams, total: i64) -> Self {
        let params = params.normalized();
        Self {
            data,
            page: params.page,
            per_page: params.per_page,
            total,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets() {
        assert_eq!(PageParams::new(1, 20).offset(), 0);
        assert_eq!(PageParams::new(3, 20).offset(), 40);
        assert_eq!(PageParams::new(0, 20).offset(), 0);
    }

    #[test]
    fn test_per_page_is_capped() {
        let params = PageParams::new(1, 10_000);
        assert_eq!(params.limit(), MAX_PER_PAGE as i64);
        assert_eq!(PageParams::new(1, 0).limit(), 1);
    }
}
