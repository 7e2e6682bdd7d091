// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Random access to the records of a dBase file.

mod window;

pub use window::DEFAULT_WINDOW_SIZE;

use crate::{
    DbfResult, Error, charset::Charset, decode::decode_field, header::Header, types::Value,
};
use bon::bon;
use log::debug;
use std::io::{Read, Seek, SeekFrom};
use window::Window;

/// Marks a deleted record in its first byte.
const DELETED_FLAG: u8 = b'*';

/// Main interface for reading dBase formatted values.
///
/// Any cell can be read in constant time. Reads are served from a read-ahead window, so scanning
/// the file in order only touches the source once per window.
///
/// ```no_run
/// # use dbf_codec::Reader;
/// # use std::fs::File;
/// let mut reader = Reader::new(File::open("roads.dbf")?)?;
/// for row in reader.rows() {
///     println!("{:?}", row?);
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// The record count declared by the header is trusted: rows beyond it are rejected even when the
/// file holds them, and rows within it that the file lacks fail with an I/O error.
#[derive(Debug)]
pub struct Reader<R> {
    header: Header,
    /// `None` once closed.
    window: Option<Window<R>>,
}

#[bon]
impl<R: Read + Seek> Reader<R> {
    /// Creates a `Reader` using the charset declared by the file, or ISO-8859-1.
    ///
    /// **NOTE** The header is read from the start of `source` upon creation of the `Reader`.
    pub fn new(source: R) -> DbfResult<Reader<R>> {
        Reader::builder(source).build()
    }

    /// Creates a `Reader`, optionally forcing the charset of the text cells and choosing the size
    /// of the read-ahead window.
    #[builder(finish_fn = build)]
    pub fn builder(
        #[builder(start_fn)] source: R,
        /// Overrides the charset declared by the file.
        charset: Option<Charset>,
        #[builder(default = DEFAULT_WINDOW_SIZE)] window_size: usize,
    ) -> DbfResult<Reader<R>> {
        let mut source = source;
        source.seek(SeekFrom::Start(0)).map_err(Error::ReadHeader)?;
        let header = Header::parse(&mut source, charset)?;
        debug!(
            "Opened dBase file with {} fields and {} records of {} bytes",
            header.field_count(),
            header.record_count(),
            header.record_length()
        );
        Ok(Reader {
            header,
            window: Some(Window::new(source, window_size)),
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Number of records declared by the header.
    pub fn get_row_count(&self) -> u32 {
        self.header.record_count()
    }

    pub fn field_count(&self) -> usize {
        self.header.field_count()
    }

    /// Decode a single cell.
    pub fn get_field_value(&mut self, row: u32, column: usize) -> DbfResult<Value> {
        let header = &self.header;
        let window = self.window.as_mut().ok_or_else(Error::Closed)?;
        let field = header
            .field(column)
            .ok_or_else(|| Error::ColumnIndex(column, header.field_count()))?;
        if row >= header.record_count() {
            return Err(Error::RowIndex(row, header.record_count()));
        }
        let position = header
            .cell_position(row, column)
            .ok_or_else(|| Error::ColumnIndex(column, header.field_count()))?;
        let raw = window
            .read_at(position, usize::from(field.length()))
            .map_err(|e| Error::ReadField(row, column, field.name().to_string(), e))?;
        Ok(decode_field(field, raw, header.charset()))
    }

    /// Decode every cell of a row, in field order.
    pub fn get_row(&mut self, row: u32) -> DbfResult<Vec<Value>> {
        (0..self.header.field_count())
            .map(|column| self.get_field_value(row, column))
            .collect()
    }

    /// Whether the record is flagged as deleted. Deleted records can still be read.
    pub fn is_deleted(&mut self, row: u32) -> DbfResult<bool> {
        let header = &self.header;
        let window = self.window.as_mut().ok_or_else(Error::Closed)?;
        if row >= header.record_count() {
            return Err(Error::RowIndex(row, header.record_count()));
        }
        let flag = window
            .read_at(header.record_position(row), 1)
            .map_err(|e| Error::ReadField(row, 0, String::new(), e))?;
        Ok(flag[0] == DELETED_FLAG)
    }

    /// Iterate over all rows in order.
    ///
    /// The iterator stops after the first error.
    pub fn rows(&mut self) -> Rows<'_, R> {
        Rows {
            reader: self,
            next: 0,
            errored: false,
        }
    }

    /// Release the source. Closing twice is a no-op, any other call fails afterwards.
    pub fn close(&mut self) {
        if self.window.take().is_some() {
            debug!("Closed dBase reader");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.window.is_none()
    }

    /// Get the source back, unless the reader has been closed.
    pub fn into_inner(self) -> DbfResult<R> {
        self.window.map(Window::into_inner).ok_or_else(Error::Closed)
    }
}

/// Iterator over the rows of a [`Reader`].
pub struct Rows<'a, R> {
    reader: &'a mut Reader<R>,
    next: u32,
    errored: bool,
}

impl<R: Read + Seek> Iterator for Rows<'_, R> {
    type Item = DbfResult<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        // to prevent keep on reading after the first error occurs
        if self.errored || self.next >= self.reader.get_row_count() {
            return None;
        }
        let row = self.reader.get_row(self.next);
        self.next += 1;
        if row.is_err() {
            self.errored = true;
        }
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.errored {
            return (0, Some(0));
        }
        let remaining = self.reader.get_row_count().saturating_sub(self.next) as usize;
        (0, Some(remaining))
    }
}
