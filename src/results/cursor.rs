use std::sync::Arc;

use crate::backend::RawResult;
use crate::codec::decode_value;
use crate::config::SessionOptions;
use crate::error::SessionError;
use crate::ordered_map::OrderedMap;
use crate::types::{DbValue, Row};

use super::ColumnDescriptor;
use super::rows::Rows;

/// Single-pass cursor over a query result.
///
/// Rows are decoded one at a time as the cursor advances; nothing is
/// buffered beyond the current row. Once the cursor has been initialised
/// (by `current`, `advance`, `rewind` or any iteration) it cannot be started
/// over, so a second `rows()` fails with `SessionError::IteratorReused`.
///
/// ```rust
/// use pg_session::prelude::*;
/// use pg_session::test_utils::MemoryResult;
///
/// let raw = MemoryResult::new(vec![RawColumn::new("i", 23, "int4")])
///     .row(&[Some("1")])
///     .row(&[Some("2")]);
/// let mut cursor = ResultCursor::new(raw, &SessionOptions::default());
///
/// let seen: Vec<i64> = cursor
///     .rows()
///     .unwrap()
///     .map(|row| row.unwrap()["i"].as_int().unwrap())
///     .collect();
/// assert_eq!(seen, vec![1, 2]);
/// assert!(matches!(cursor.rows(), Err(SessionError::IteratorReused)));
/// ```
pub struct ResultCursor<R: RawResult> {
    raw: R,
    columns: Arc<Vec<ColumnDescriptor>>,
    initialized: bool,
    exhausted: bool,
    current: Option<Row>,
    position: usize,
}

impl<R: RawResult> std::fmt::Debug for ResultCursor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCursor")
            .field("columns", &self.columns)
            .field("row_count", &self.raw.row_count())
            .field("position", &self.position)
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

impl<R: RawResult> ResultCursor<R> {
    /// Wrap a raw result, resolving each column's type name once.
    pub fn new(raw: R, options: &SessionOptions) -> Self {
        let columns = raw
            .columns()
            .iter()
            .map(|column| ColumnDescriptor::resolve(column, options.types()))
            .collect();
        Self {
            raw,
            columns: Arc::new(columns),
            initialized: false,
            exhausted: false,
            current: None,
            position: 0,
        }
    }

    /// Number of rows the server reported for this result.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.raw.row_count()
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Column name to resolved type name, in column order.
    #[must_use]
    pub fn column_type_map(&self) -> OrderedMap<String> {
        self.columns
            .iter()
            .map(|column| (column.name.clone(), column.type_name.clone()))
            .collect()
    }

    /// How many rows have been decoded so far.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Decode the next raw row into the current row.
    ///
    /// # Errors
    /// Returns the decode error for the first column whose text cannot be
    /// parsed; the current row is then empty.
    pub fn advance(&mut self) -> Result<bool, SessionError> {
        self.initialized = true;
        self.current = None;
        if self.exhausted {
            return Ok(false);
        }
        let Some(values) = self.raw.next_row() else {
            self.exhausted = true;
            return Ok(false);
        };
        self.current = Some(self.decode_row(values)?);
        self.position += 1;
        Ok(true)
    }

    /// The current row, advancing to the first one on first use.
    ///
    /// # Errors
    /// Propagates decode errors from that first advance.
    pub fn current(&mut self) -> Result<Option<&Row>, SessionError> {
        if !self.initialized {
            self.advance()?;
        }
        Ok(self.current.as_ref())
    }

    /// Start iteration. Only possible once.
    ///
    /// # Errors
    /// `SessionError::IteratorReused` if the cursor was already initialised.
    pub fn rewind(&mut self) -> Result<(), SessionError> {
        if self.initialized {
            return Err(SessionError::IteratorReused);
        }
        self.advance().map(|_| ())
    }

    /// Iterate over all rows.
    ///
    /// # Errors
    /// `SessionError::IteratorReused` on a cursor that was already started.
    pub fn rows(&mut self) -> Result<Rows<'_, R>, SessionError> {
        self.rewind()?;
        Ok(Rows::new(self))
    }

    /// Take the current row (or the next one if it was already taken).
    ///
    /// # Errors
    /// Propagates decode errors.
    pub fn next_row(&mut self) -> Result<Option<Row>, SessionError> {
        if self.current.is_none() && !self.exhausted {
            self.advance()?;
        }
        Ok(self.current.take())
    }

    /// Value of one field in the current row.
    ///
    /// # Errors
    /// `SessionError::EmptyResultSet` when the result has no rows at all,
    /// `SessionError::NoCurrentRow` when the current row was already taken
    /// or the rows were read to the end, `SessionError::FieldNotFound` for
    /// an unknown column.
    pub fn field_value(&mut self, name: &str) -> Result<&DbValue, SessionError> {
        if self.row_count() == 0 {
            return Err(SessionError::EmptyResultSet);
        }
        let row = self.current()?.ok_or(SessionError::NoCurrentRow)?;
        row.get(name)
            .ok_or_else(|| SessionError::FieldNotFound(name.to_string()))
    }

    /// Remaining rows as a list.
    ///
    /// # Errors
    /// Propagates decode errors.
    pub fn collect_as_list(&mut self) -> Result<Vec<Row>, SessionError> {
        let mut rows = Vec::with_capacity(self.row_count().saturating_sub(self.position));
        while let Some(row) = self.next_row()? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Remaining rows keyed by the text of `key`, which is removed from each
    /// row. A repeated key keeps its first position but takes the last row.
    ///
    /// # Errors
    /// `SessionError::FieldNotFound` for an unknown key column,
    /// `SessionError::UnsupportedKey` when a key value is composite.
    pub fn collect_as_map(&mut self, key: &str) -> Result<OrderedMap<Row>, SessionError> {
        let mut map = OrderedMap::new();
        while let Some(mut row) = self.next_row()? {
            let key_value = take_key(&mut row, key)?;
            map.insert(key_value, row);
        }
        Ok(map)
    }

    /// Remaining rows as `key` text to the value of `value`.
    ///
    /// # Errors
    /// As [`ResultCursor::collect_as_map`], plus `SessionError::FieldNotFound`
    /// for an unknown value column.
    pub fn collect_as_map_of(
        &mut self,
        key: &str,
        value: &str,
    ) -> Result<OrderedMap<DbValue>, SessionError> {
        let mut map = OrderedMap::new();
        while let Some(mut row) = self.next_row()? {
            let key_value = take_key(&mut row, key)?;
            let field = row
                .remove(value)
                .ok_or_else(|| SessionError::FieldNotFound(value.to_string()))?;
            map.insert(key_value, field);
        }
        Ok(map)
    }

    fn decode_row(&self, values: Vec<Option<String>>) -> Result<Row, SessionError> {
        let mut row = Row::with_capacity(self.columns.len());
        let mut values = values.into_iter();
        for column in self.columns.iter() {
            let raw = values.next().flatten();
            row.insert(
                column.name.clone(),
                decode_value(&column.type_name, raw.as_deref())?,
            );
        }
        Ok(row)
    }
}

fn take_key(row: &mut Row, key: &str) -> Result<String, SessionError> {
    let value = row
        .remove(key)
        .ok_or_else(|| SessionError::FieldNotFound(key.to_string()))?;
    value
        .key_text()
        .ok_or_else(|| SessionError::UnsupportedKey(key.to_string()))
}
