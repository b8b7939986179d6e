use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use futures::stream::BoxStream;

use crate::Result;
use crate::pool::DatabasePool;
use crate::row::Row;

/// A lazy, single-pass stream of rows produced by `execute`.
///
/// The statement runs on a connection acquired from the pool when the stream
/// is first polled, and the connection is released when the stream ends or is
/// dropped. The stream ends after the first error.
#[must_use = "streams do nothing unless polled"]
pub struct RowStream<'a> {
   inner: BoxStream<'a, Result<Row>>,
   done: bool,
}

impl<'a> RowStream<'a> {
   pub(crate) fn new(pool: &'a DatabasePool, statement: &'a str) -> Self {
      Self {
         inner: pool.fetch(statement),
         done: false,
      }
   }
}

impl std::fmt::Debug for RowStream<'_> {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.debug_struct("RowStream")
         .field("done", &self.done)
         .finish_non_exhaustive()
   }
}

impl Stream for RowStream<'_> {
   type Item = Result<Row>;

   fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
      if self.done {
         return Poll::Ready(None);
      }

      match self.inner.as_mut().poll_next(cx) {
         Poll::Ready(Some(Ok(row))) => Poll::Ready(Some(Ok(row))),
         Poll::Ready(Some(Err(err))) => {
            self.done = true;
            Poll::Ready(Some(Err(err)))
         }
         Poll::Ready(None) => {
            self.done = true;
            Poll::Ready(None)
         }
         Poll::Pending => Poll::Pending,
      }
   }
}
