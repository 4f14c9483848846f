//! Count-then-page list protocol over SeaORM selects.

use std::str::FromStr;

use paging::{Page, ResolvedPagination, SortDir};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, IdenStatic, Order, PaginatorTrait, QueryOrder,
    QuerySelect, Select,
};

use crate::DbError;

fn to_order(dir: SortDir) -> Order {
    match dir {
        SortDir::Asc => Order::Asc,
        SortDir::Desc => Order::Desc,
    }
}

/// Apply ordering and the limit/offset window to a filtered select.
///
/// The resolved order column, or `default_order` ascending when the request
/// carries none, is followed by `tiebreaker` so page boundaries are stable.
pub fn apply_page<E>(
    select: Select<E>,
    page: &ResolvedPagination,
    default_order: E::Column,
    tiebreaker: E::Column,
) -> Result<Select<E>, DbError>
where
    E: EntityTrait,
{
    let (col, dir) = match &page.order {
        Some(key) => {
            let col = <E::Column as FromStr>::from_str(&key.column)
                .map_err(|_| DbError::UnknownColumn(key.column.clone()))?;
            (col, key.dir)
        }
        None => (default_order, SortDir::Asc),
    };

    let same = col.as_str() == tiebreaker.as_str();
    let mut select = select.order_by(col, to_order(dir));
    if !same {
        select = select.order_by(tiebreaker, to_order(dir));
    }

    Ok(select.limit(page.limit).offset(page.offset))
}

/// Count the rows matching `select`, then fetch one page of them.
///
/// `select` must carry only the predicates (no ordering or window); the same
/// predicate set drives both statements. A zero count short-circuits with an
/// empty page and no second query.
///
/// Both statements run on `conn`. Under READ COMMITTED another transaction can
/// commit between them, so `total` may disagree with what the page shows.
pub async fn count_then_fetch<E, C>(
    conn: &C,
    select: Select<E>,
    page: &ResolvedPagination,
    default_order: E::Column,
    tiebreaker: E::Column,
) -> Result<Page<E::Model>, DbError>
where
    E: EntityTrait,
    E::Model: Send + Sync,
    E::Column: ColumnTrait,
    C: ConnectionTrait,
{
    let total = select.clone().count(conn).await?;
    if total == 0 {
        return Ok(Page::empty());
    }

    let rows = apply_page(select, page, default_order, tiebreaker)?
        .all(conn)
        .await?;
    Ok(Page::new(rows, total))
}
