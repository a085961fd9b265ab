//! Page-number pagination over any sea-orm paginator source.

use crudkit_query::{Page, PageParams};
use sea_orm::{
    ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryResult, QuerySelect, QueryTrait,
    Select, SelectorTrait,
};

/// Fetch one page window of `source`.
///
/// The total, when requested, counts the same query shape wrapped as a
/// subquery, so grouped selections count groups rather than rows.
///
/// # Errors
/// Returns `DbErr` if either the window or the count query fails.
pub async fn fetch_page<'db, C, P>(
    source: P,
    conn: &'db C,
    params: &PageParams,
) -> Result<Page<<P::Selector as SelectorTrait>::Item>, DbErr>
where
    C: ConnectionTrait,
    P: PaginatorTrait<'db, C>,
{
    tracing::debug!(
        page = params.page,
        size = params.size,
        offset = params.offset(),
        include_total = params.include_total,
        "fetching page"
    );
    let paginator = source.paginate(conn, params.size);
    let items = paginator.fetch_page(params.page.saturating_sub(1)).await?;
    let total = if params.include_total {
        Some(paginator.num_items().await?)
    } else {
        None
    };
    Ok(Page::new(items, params, total))
}

/// Fetch one page window of `select` as raw rows, for selections whose
/// computed columns the caller decodes itself.
///
/// # Errors
/// Returns `DbErr` if either the window or the count query fails.
pub async fn fetch_row_page<C, E>(
    select: Select<E>,
    conn: &C,
    params: &PageParams,
) -> Result<Page<QueryResult>, DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    tracing::debug!(
        page = params.page,
        size = params.size,
        offset = params.offset(),
        include_total = params.include_total,
        "fetching row page"
    );
    let window = select
        .clone()
        .offset(params.offset())
        .limit(params.size)
        .build(conn.get_database_backend());
    let items = conn.query_all(window).await?;
    let total = if params.include_total {
        Some(select.into_json().paginate(conn, params.size).num_items().await?)
    } else {
        None
    };
    Ok(Page::new(items, params, total))
}
