use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while resolving a client paging request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("limit {requested} exceeds maximum of {max}")]
    InvalidLimit { requested: u64, max: u64 },

    #[error("offset {requested} exceeds maximum of {max}")]
    InvalidOffset { requested: u64, max: u64 },

    #[error("unsupported sort key: {key}")]
    InvalidSortKey { key: String },
}

/// Largest offset a resolved page may carry. SQL drivers bind offsets as
/// signed 64-bit integers.
pub const MAX_OFFSET: u64 = i64::MAX as u64;

#[cfg_attr(feature = "with-utoipa", derive(utoipa::ToSchema))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for SortDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDir::Asc => f.write_str("asc"),
            SortDir::Desc => f.write_str("desc"),
        }
    }
}

/// Client-supplied paging window. `None` means "not provided".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl PageRequest {
    pub fn new(limit: Option<u64>, offset: Option<u64>) -> Self {
        Self { limit, offset }
    }
}

/// Client-supplied ordering, expressed with a public sort key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortRequest {
    pub key: String,
    pub dir: SortDir,
}

impl SortRequest {
    pub fn new(key: impl Into<String>, dir: SortDir) -> Self {
        Self {
            key: key.into(),
            dir,
        }
    }
}

/// Ordering on a storage column, produced only from an allow-listed key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderKey {
    pub column: String,
    pub dir: SortDir,
}

/// Paging request after policy validation.
///
/// `limit` is always within `1..=max_limit` of the policy that produced it.
/// `order` is `None` when the client asked for no particular order; the query
/// layer then applies the resource's own default ordering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPagination {
    pub limit: u64,
    pub offset: u64,
    pub order: Option<OrderKey>,
}

/// Per-resource paging rules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaginationPolicy {
    max_limit: u64,
    default_limit: u64,
    sort_keys: BTreeMap<String, String>,
}

impl PaginationPolicy {
    /// Build a policy. Both limits are normalised so that
    /// `1 <= default_limit <= max_limit` holds.
    pub fn new(default_limit: u64, max_limit: u64) -> Self {
        let max_limit = max_limit.max(1);
        Self {
            max_limit,
            default_limit: default_limit.clamp(1, max_limit),
            sort_keys: BTreeMap::new(),
        }
    }

    /// Allow sorting by `public_key`, which maps onto storage column `column`.
    /// Public keys are matched case-insensitively.
    pub fn with_sort_key(mut self, public_key: &str, column: impl Into<String>) -> Self {
        self.sort_keys
            .insert(public_key.to_ascii_lowercase(), column.into());
        self
    }

    pub fn max_limit(&self) -> u64 {
        self.max_limit
    }

    pub fn default_limit(&self) -> u64 {
        self.default_limit
    }

    pub fn sort_keys(&self) -> impl Iterator<Item = &str> {
        self.sort_keys.keys().map(String::as_str)
    }

    /// Validate a paging request.
    ///
    /// A missing or zero limit resolves to the default limit. A limit above the
    /// maximum is rejected rather than clamped. So is an offset above
    /// [`MAX_OFFSET`] and an unknown sort key.
    pub fn resolve(
        &self,
        page: &PageRequest,
        sort: Option<&SortRequest>,
    ) -> Result<ResolvedPagination, PageError> {
        let limit = match page.limit {
            None | Some(0) => self.default_limit,
            Some(n) if n > self.max_limit => {
                return Err(PageError::InvalidLimit {
                    requested: n,
                    max: self.max_limit,
                })
            }
            Some(n) => n,
        };

        let offset = page.offset.unwrap_or(0);
        if offset > MAX_OFFSET {
            return Err(PageError::InvalidOffset {
                requested: offset,
                max: MAX_OFFSET,
            });
        }

        let order = match sort {
            Some(s) if !s.key.trim().is_empty() => {
                let key = s.key.trim().to_ascii_lowercase();
                let column = self
                    .sort_keys
                    .get(&key)
                    .ok_or_else(|| PageError::InvalidSortKey {
                        key: s.key.clone(),
                    })?;
                Some(OrderKey {
                    column: column.clone(),
                    dir: s.dir,
                })
            }
            _ => None,
        };

        Ok(ResolvedPagination {
            limit,
            offset,
            order,
        })
    }
}
