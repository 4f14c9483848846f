use serde::{Deserialize, Serialize};

/// One page of results together with the total number of matching rows.
#[cfg_attr(feature = "with-utoipa", derive(utoipa::ToSchema))]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64) -> Self {
        Self { items, total }
    }

    /// Zero-result page. `items` is an empty vector, never absent.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map_items<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: map_all(self.items, f),
            total: self.total,
        }
    }

    /// Map every item, failing the whole page on the first error.
    pub fn try_map_items<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        Ok(Page {
            items: try_map_all(self.items, f)?,
            total: self.total,
        })
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::empty()
    }
}

pub fn map_all<T, U>(items: Vec<T>, f: impl FnMut(T) -> U) -> Vec<U> {
    items.into_iter().map(f).collect()
}

/// Fallible mapping over a row set. Partial output is never returned.
pub fn try_map_all<T, U, E>(
    items: Vec<T>,
    f: impl FnMut(T) -> Result<U, E>,
) -> Result<Vec<U>, E> {
    items.into_iter().map(f).collect()
}
