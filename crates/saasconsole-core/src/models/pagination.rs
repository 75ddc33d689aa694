use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::constants::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

fn default_limit() -> usize {
    DEFAULT_PAGE_LIMIT
}

/// Cursor-based paging parameters shared by list endpoints
#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Opaque cursor returned as `last_evaluated_key` by the previous page
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            cursor: None,
            search: None,
        }
    }
}

impl PageQuery {
    pub fn clamped_limit(&self) -> usize {
        self.limit.clamp(1, MAX_PAGE_LIMIT)
    }

    pub fn search_text(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
    }
}

/// One page of results plus the cursor of the next page.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub last_evaluated_key: Option<String>,
}

impl<T> Paginated<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            last_evaluated_key: self.last_evaluated_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_clamped() {
        let q = PageQuery {
            limit: 0,
            ..Default::default()
        };
        assert_eq!(q.clamped_limit(), 1);
        let q = PageQuery {
            limit: 10_000,
            ..Default::default()
        };
        assert_eq!(q.clamped_limit(), MAX_PAGE_LIMIT);
    }

    #[test]
    fn blank_search_is_ignored() {
        let q = PageQuery {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(q.search_text(), None);
    }
}
