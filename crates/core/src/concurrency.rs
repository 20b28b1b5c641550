use std::future::Future;

use futures::stream::{self, StreamExt};

/// Runs `f` over `items` with at most `limit` futures in flight.
///
/// Outputs come back in input order, one per item. Failures are ordinary
/// outputs, so one failing call never cancels the others. A `limit` of zero
/// is treated as one.
pub async fn map_bounded<I, F, Fut>(items: I, limit: usize, f: F) -> Vec<Fut::Output>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future,
{
    stream::iter(items).map(f).buffered(limit.max(1)).collect().await
}
