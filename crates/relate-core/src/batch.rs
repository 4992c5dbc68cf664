//! Best-effort fan-out over a list of ids.

use futures_util::future::join_all;
use std::future::Future;

use crate::error::Result;

/// One outcome per input id, in input order.
pub type BatchResult<T> = Vec<Result<T>>;

/// Run `f` for every id concurrently and collect every outcome.
///
/// A failing id never cancels its siblings.
pub async fn for_each<F, Fut, T>(ids: &[String], f: F) -> BatchResult<T>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    join_all(ids.iter().cloned().map(f)).await
}
