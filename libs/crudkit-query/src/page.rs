//! Page-number pagination contracts.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Server-side bounds for page sizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaginationLimits {
    /// Size used when the caller does not ask for one.
    pub default_size: u64,
    /// Largest size a caller may ask for.
    pub max_size: u64,
}

impl Default for PaginationLimits {
    fn default() -> Self {
        Self {
            default_size: 50,
            max_size: 100,
        }
    }
}

impl PaginationLimits {
    /// Window for `page`; `size` falls back to `default_size` when the caller
    /// did not ask for one.
    pub fn params(&self, page: u64, size: Option<u64>) -> PageParams {
        PageParams::new(page, size.unwrap_or(self.default_size))
    }
}

/// Requested page window. Pages are 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[must_use]
pub struct PageParams {
    pub page: u64,
    pub size: u64,
    /// Also count the full result set.
    pub include_total: bool,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 1,
            size: PaginationLimits::default().default_size,
            include_total: false,
        }
    }
}

impl PageParams {
    pub fn new(page: u64, size: u64) -> Self {
        Self {
            page,
            size,
            include_total: false,
        }
    }

    pub fn with_total(mut self) -> Self {
        self.include_total = true;
        self
    }

    /// Check the window against `limits`.
    ///
    /// # Errors
    /// Returns `ValidationError::InvalidPage` if `page` or `size` is zero or
    /// `size` exceeds `limits.max_size`.
    pub fn validate(&self, limits: &PaginationLimits) -> Result<(), ValidationError> {
        if self.page == 0 {
            return Err(ValidationError::InvalidPage {
                field: "page",
                reason: "must be greater than or equal to 1".to_owned(),
            });
        }
        if self.size == 0 {
            return Err(ValidationError::InvalidPage {
                field: "size",
                reason: "must be greater than or equal to 1".to_owned(),
            });
        }
        if self.size > limits.max_size {
            return Err(ValidationError::InvalidPage {
                field: "size",
                reason: format!("must be less than or equal to {}", limits.max_size),
            });
        }
        Ok(())
    }

    /// Number of rows skipped before this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.size)
    }
}

/// One page of results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    pub page: u64,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u64>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, params: &PageParams, total: Option<u64>) -> Self {
        let pages = total.map(|t| if params.size == 0 { 0 } else { t.div_ceil(params.size) });
        Self {
            items,
            total,
            page: params.page,
            size: params.size,
            pages,
        }
    }

    pub fn map_items<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            size: self.size,
            pages: self.pages,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let p = PageParams::default();
        assert_eq!((p.page, p.size, p.include_total), (1, 50, false));
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn missing_size_uses_configured_default() {
        let limits = PaginationLimits {
            default_size: 20,
            max_size: 100,
        };
        assert_eq!(limits.params(2, None), PageParams::new(2, 20));
        assert_eq!(limits.params(2, Some(5)), PageParams::new(2, 5));
    }

    #[test]
    fn offset_is_zero_based() {
        assert_eq!(PageParams::new(3, 20).offset(), 40);
    }

    #[test]
    fn validate_bounds() {
        let limits = PaginationLimits::default();
        assert!(PageParams::new(1, 100).validate(&limits).is_ok());
        assert!(matches!(
            PageParams::new(0, 10).validate(&limits),
            Err(ValidationError::InvalidPage { field: "page", .. })
        ));
        assert!(matches!(
            PageParams::new(1, 0).validate(&limits),
            Err(ValidationError::InvalidPage { field: "size", .. })
        ));
        assert!(matches!(
            PageParams::new(1, 101).validate(&limits),
            Err(ValidationError::InvalidPage { field: "size", .. })
        ));
    }

    #[test]
    fn total_is_serialized_only_when_known() {
        let params = PageParams::new(2, 10);
        let without = serde_json::to_value(Page::new(vec![1, 2], &params, None)).unwrap();
        assert_eq!(
            without,
            serde_json::json!({"items": [1, 2], "page": 2, "size": 10})
        );

        let with = serde_json::to_value(Page::new(vec![1, 2], &params, Some(21))).unwrap();
        assert_eq!(with["total"], 21);
        assert_eq!(with["pages"], 3);
    }

    #[test]
    fn params_deserialize_with_defaults() {
        let p: PageParams = serde_json::from_str(r#"{"page": 4}"#).unwrap();
        assert_eq!(p, PageParams::new(4, 50));
    }
}
