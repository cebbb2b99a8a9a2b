//! Pagination helpers shared by every listing endpoint

use crate::models::{Certificate, Department, Program, UserProfile};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Default page size used when the requested one is out of range
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Largest page size a client may ask for
pub const MAX_PAGE_SIZE: i64 = 100;

/// A clamped page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
}

impl PageRequest {
    /// Clamp raw client input: page <= 0 becomes 1, size <= 0 or > 100 becomes 10
    pub fn clamp(page: i64, size: i64) -> Self {
        let page = if page <= 0 { 1 } else { page };
        let size = if size <= 0 || size > MAX_PAGE_SIZE {
            DEFAULT_PAGE_SIZE
        } else {
            size
        };
        Self { page, size }
    }

    /// Clamp optional query parameters
    pub fn from_query(page: Option<i64>, size: Option<i64>) -> Self {
        Self::clamp(page.unwrap_or(1), size.unwrap_or(DEFAULT_PAGE_SIZE))
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Listing metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: i64,
    pub limit: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

/// A page of items plus its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[aliases(
    DepartmentPage = Paginated<Department>,
    ProgramPage = Paginated<Program>,
    CertificatePage = Paginated<Certificate>,
    UserPage = Paginated<UserProfile>
)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub meta: PaginationMeta,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total_items: i64, request: PageRequest) -> Self {
        let total_pages = if total_items <= 0 {
            0
        } else {
            (total_items + request.size - 1) / request.size
        };

        Self {
            items,
            meta: PaginationMeta {
                page: request.page,
                limit: request.size,
                total_items,
                total_pages,
            },
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clamp_defaults() {
        assert_eq!(PageRequest::clamp(0, 0), PageRequest { page: 1, size: 10 });
        assert_eq!(PageRequest::clamp(-3, 101), PageRequest { page: 1, size: 10 });
        assert_eq!(PageRequest::clamp(2, 100), PageRequest { page: 2, size: 100 });
        assert_eq!(PageRequest::from_query(None, None), PageRequest::default());
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let page = Paginated::new(vec![1, 2, 3], 21, PageRequest::clamp(1, 10));
        assert_eq!(page.meta.total_pages, 3);
        assert_eq!(page.meta.total_items, 21);

        let empty: Paginated<i32> = Paginated::new(vec![], 0, PageRequest::default());
        assert_eq!(empty.meta.total_pages, 0);
    }

    #[test]
    fn test_meta_serializes_camel_case() {
        let page = Paginated::new(vec!["a"], 1, PageRequest::default());
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["meta"]["totalItems"], 1);
        assert_eq!(json["meta"]["totalPages"], 1);
        assert_eq!(json["meta"]["limit"], 10);
    }

    proptest! {
        #[test]
        fn clamp_always_in_range(page in any::<i64>(), size in any::<i64>()) {
            let req = PageRequest::clamp(page, size);
            prop_assert!(req.page >= 1);
            prop_assert!(req.size >= 1 && req.size <= MAX_PAGE_SIZE);
            prop_assert!(req.offset() >= 0);
        }
    }
}
