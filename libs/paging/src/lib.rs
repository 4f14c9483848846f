//! Storage-agnostic pagination primitives.
//!
//! A [`PaginationPolicy`] validates a client's paging and sort request against
//! per-resource limits and a sort-key allow-list, producing a
//! [`ResolvedPagination`] that is safe to hand to the query layer. Results come
//! back as a [`Page`], which pairs the returned items with the total count of
//! rows matching the same predicate set.

pub mod page;
pub mod policy;

pub use page::{map_all, try_map_all, Page};
pub use policy::{
    OrderKey, PageError, PageRequest, MAX_OFFSET, PaginationPolicy, ResolvedPagination, SortDir, SortRequest,
};
