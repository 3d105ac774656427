use crate::backend::RawResult;
use crate::error::SessionError;
use crate::types::Row;

use super::ResultCursor;

/// Borrowing iterator returned by [`ResultCursor::rows`].
///
/// Stops after the first decode error.
pub struct Rows<'a, R: RawResult> {
    cursor: &'a mut ResultCursor<R>,
    failed: bool,
}

impl<'a, R: RawResult> Rows<'a, R> {
    pub(super) fn new(cursor: &'a mut ResultCursor<R>) -> Self {
        Self {
            cursor,
            failed: false,
        }
    }
}

impl<R: RawResult> Iterator for Rows<'_, R> {
    type Item = Result<Row, SessionError>;

    fn next(&mut self) -> Option<Self::Item> {
        next_from(self.cursor, &mut self.failed)
    }
}

/// Consuming iterator over the rows a cursor has not handed out yet.
pub struct IntoRows<R: RawResult> {
    cursor: ResultCursor<R>,
    failed: bool,
}

impl<R: RawResult> Iterator for IntoRows<R> {
    type Item = Result<Row, SessionError>;

    fn next(&mut self) -> Option<Self::Item> {
        next_from(&mut self.cursor, &mut self.failed)
    }
}

impl<R: RawResult> IntoIterator for ResultCursor<R> {
    type Item = Result<Row, SessionError>;
    type IntoIter = IntoRows<R>;

    fn into_iter(self) -> Self::IntoIter {
        IntoRows {
            cursor: self,
            failed: false,
        }
    }
}

fn next_from<R: RawResult>(
    cursor: &mut ResultCursor<R>,
    failed: &mut bool,
) -> Option<Result<Row, SessionError>> {
    if *failed {
        return None;
    }
    match cursor.next_row() {
        Ok(row) => row.map(Ok),
        Err(err) => {
            *failed = true;
            Some(Err(err))
        }
    }
}
