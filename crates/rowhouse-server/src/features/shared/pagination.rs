//! Shared pagination helpers for list queries.

use serde::{Deserialize, Serialize};

/// Page/size request parameters with sane defaults (page 1, 20 items,
/// clamped to 1-100).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i64>,
}

impl PageParams {
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        Self { page, page_size }
    }

    /// 1-indexed page number.
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Items per page, clamped to 1-100.
    pub fn page_size(&self) -> i64 {
        self.page_size.unwrap_or(20).clamp(1, 100)
    }

    /// Offset for the repository call.
    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.page_size()
    }
}

/// Metadata echoed back with every page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageInfo {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub pages: i64,
}

impl PageInfo {
    pub fn new(params: &PageParams, total: i64) -> Self {
        let page_size = params.page_size();
        let pages = if total == 0 {
            0
        } else {
            (total + page_size - 1) / page_size
        };
        Self {
            page: params.page(),
            page_size,
            total,
            pages,
        }
    }
}

/// A page of items plus its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: PageInfo,
}

impl<T> Paginated<T> {
    pub fn from_items(items: Vec<T>, params: &PageParams, total: i64) -> Self {
        Self {
            items,
            pagination: PageInfo::new(params, total),
        }
    }
}
