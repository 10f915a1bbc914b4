use serde::{Deserialize, Serialize};

/// 分页请求（页码从 1 开始）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingFilter {
    pub page: u64,
    pub page_size: u64,
}

impl PagingFilter {
    /// 页码与页大小至少为 1
    pub fn new(page: u64, page_size: u64) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    /// 当前页是否包含结果集末尾（总数为 0 时仅第一页）
    pub fn holds_end_of(&self, total: u64) -> bool {
        if total == 0 {
            return self.page == 1;
        }
        let offset = self.offset();
        offset < total && total <= offset.saturating_add(self.page_size)
    }
}

/// 分页结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paging<T> {
    pub page: u64,
    pub page_size: u64,
    pub total_count: u64,
    pub items: Vec<T>,
}

impl<T> Paging<T> {
    pub fn new(filter: PagingFilter, total_count: u64, items: Vec<T>) -> Self {
        Self {
            page: filter.page,
            page_size: filter.page_size,
            total_count,
            items,
        }
    }

    pub fn empty(filter: PagingFilter) -> Self {
        Self::new(filter, 0, Vec::new())
    }

    pub fn page_count(&self) -> u64 {
        self.total_count.div_ceil(self.page_size.max(1))
    }

    /// 当前页是否为最后一页（总数为 0 时第一页即最后一页）
    pub fn is_last_page(&self) -> bool {
        self.page >= self.page_count().max(1)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paging<U> {
        Paging {
            page: self.page,
            page_size: self.page_size,
            total_count: self.total_count,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}
