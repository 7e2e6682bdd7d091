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

//! Logic handling writing in dBase format at user level.

use crate::{DbfResult, Error, encode::RecordEncoder, header::Header, types::Value};
use log::{debug, trace, warn};
use std::io::Write;

/// Optional byte marking the end of the records.
pub const EOF_MARKER: u8 = 0x1A;

/// Main interface for writing dBase formatted values.
///
/// The header is written as soon as the `Writer` is built, each row is written and flushed by
/// [`insert_row`](Writer::insert_row). The record count stored in the header is the one it was
/// built with, it is not updated as rows are appended.
///
/// Values wider than their field are truncated silently, see [`crate::encode`] for the rules.
#[derive(Debug)]
pub struct Writer<W: Write> {
    header: Header,
    /// `None` once closed.
    writer: Option<W>,
    encoder: RecordEncoder,
    /// One record, reused for every row.
    record: Vec<u8>,
    rows_written: u64,
    eof_marker: bool,
}

#[bon::bon]
impl<W: Write> Writer<W> {
    /// Creates a `Writer` and writes the header to `writer`.
    pub fn new(header: Header, writer: W) -> DbfResult<Self> {
        Self::builder().header(header).writer(writer).build()
    }

    /// Creates a `Writer` and writes the header to `writer`.
    #[builder(finish_fn = build)]
    pub fn builder(
        header: Header,
        writer: W,
        /// Write a `0x1A` byte after the last record when closing.
        ///
        /// Most readers do without it, so it is off by default.
        #[builder(default = false)]
        eof_marker: bool,
    ) -> DbfResult<Self> {
        let mut writer = writer;
        let header = header.normalized();
        header.write(&mut writer)?;
        debug!(
            "Writing dBase file with {} fields and {} records of {} bytes in {}",
            header.field_count(),
            header.record_count(),
            header.record_length(),
            header.charset()
        );
        Ok(Self {
            encoder: RecordEncoder::new(&header),
            record: Vec::with_capacity(usize::from(header.record_length())),
            header,
            writer: Some(writer),
            rows_written: 0,
            eof_marker,
        })
    }
}

impl<W: Write> Writer<W> {
    /// Encode and write one row, in field order.
    ///
    /// Returns the number of bytes written, always the header's record length. Nothing is
    /// written when the row does not fit the header.
    pub fn insert_row(&mut self, row: &[Value]) -> DbfResult<usize> {
        let writer = self.writer.as_mut().ok_or_else(Error::Closed)?;
        self.record.clear();
        self.encoder
            .encode_row(&self.header, row, &mut self.record)?;
        writer
            .write_all(&self.record)
            .map_err(|e| Error::WriteRecord(self.rows_written, e))?;
        writer.flush().map_err(Error::FlushWriter)?;
        trace!("Wrote record {}", self.rows_written);
        self.rows_written += 1;
        Ok(self.record.len())
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    /// Finish the file and release the underlying writer.
    ///
    /// Closing twice is a no-op.
    pub fn close(&mut self) -> DbfResult<()> {
        match self.writer.take() {
            Some(mut writer) => self.finish(&mut writer),
            None => Ok(()),
        }
    }

    /// Finish the file and get the underlying writer back.
    pub fn into_inner(mut self) -> DbfResult<W> {
        let mut writer = self.writer.take().ok_or_else(Error::Closed)?;
        self.finish(&mut writer)?;
        Ok(writer)
    }

    fn finish(&self, writer: &mut W) -> DbfResult<()> {
        if self.eof_marker {
            writer
                .write_all(&[EOF_MARKER])
                .map_err(|e| Error::WriteRecord(self.rows_written, e))?;
        }
        writer.flush().map_err(Error::FlushWriter)?;
        if self.rows_written != u64::from(self.header.record_count()) {
            warn!(
                "Wrote {} records but the header declares {}",
                self.rows_written,
                self.header.record_count()
            );
        }
        debug!("Closed dBase writer after {} records", self.rows_written);
        Ok(())
    }
}

impl<W: Write> Drop for Writer<W> {
    /// Drop the writer, will try to finish the file ignoring any errors.
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Reader, error::ErrorCategory, schema::FieldDescriptor};
    use jiff::civil::date;
    use pretty_assertions::assert_eq;
    use std::io::{self, Cursor};

    type TestResult = anyhow::Result<()>;

    fn header(fields: Vec<FieldDescriptor>, records: u32) -> DbfResult<Header> {
        Header::builder()
            .fields(fields)
            .record_count(records)
            .last_update(date(2024, 5, 17))
            .build()
    }

    fn records(bytes: &[u8], header: &Header) -> Vec<u8> {
        bytes[usize::from(header.header_length())..].to_vec()
    }

    #[test]
    fn writes_header_then_records() -> TestResult {
        let header = header(vec![FieldDescriptor::character("NAME", 10)], 1)?;
        let mut writer = Writer::new(header.clone(), Vec::new())?;
        assert_eq!(writer.insert_row(&[Value::from("Alice")])?, 11);
        assert_eq!(writer.rows_written(), 1);

        let bytes = writer.into_inner()?;
        assert_eq!(&bytes[..33 + 32], &header.to_bytes()[..]);
        assert_eq!(records(&bytes, &header), b" Alice     ".to_vec());
        Ok(())
    }

    #[test]
    fn numbers_are_right_justified() -> TestResult {
        let header = header(vec![FieldDescriptor::numeric("POP", 5, 0)], 2)?;
        let mut writer = Writer::new(header.clone(), Vec::new())?;
        writer.insert_row(&[Value::Int(12345)])?;
        writer.insert_row(&[Value::Int(-1)])?;
        let bytes = writer.into_inner()?;
        assert_eq!(records(&bytes, &header), b" 12345    -1".to_vec());
        Ok(())
    }

    #[test]
    fn rejected_rows_write_nothing() -> TestResult {
        let header = header(vec![FieldDescriptor::logical("OK")], 1)?;
        let mut writer = Writer::new(header.clone(), Vec::new())?;
        let err = writer.insert_row(&[Value::from("yes")]).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::ValueMismatch);
        let err = writer.insert_row(&[]).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::ValueMismatch);
        assert_eq!(writer.rows_written(), 0);
        let bytes = writer.into_inner()?;
        assert_eq!(bytes.len(), usize::from(header.header_length()));
        Ok(())
    }

    #[test]
    fn eof_marker_is_optional() -> TestResult {
        let header = header(vec![FieldDescriptor::logical("OK")], 1)?;
        let mut writer = Writer::builder()
            .header(header.clone())
            .writer(Vec::new())
            .eof_marker(true)
            .build()?;
        writer.insert_row(&[Value::from(true)])?;
        let bytes = writer.into_inner()?;
        assert_eq!(records(&bytes, &header), vec![b' ', b'T', EOF_MARKER]);

        // The reader ignores whatever follows the declared records
        let mut reader = Reader::new(Cursor::new(bytes))?;
        assert_eq!(reader.get_row(0)?, vec![Value::Boolean(true)]);
        Ok(())
    }

    #[test]
    fn close_is_idempotent() -> TestResult {
        let header = header(vec![FieldDescriptor::logical("OK")], 0)?;
        let mut writer = Writer::new(header, Vec::new())?;
        writer.close()?;
        writer.close()?;
        assert!(writer.is_closed());
        let err = writer.insert_row(&[Value::Null]).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::State);
        Ok(())
    }

    #[test]
    fn skipped_descriptors_are_not_written_back() -> TestResult {
        let header = header(
            vec![
                FieldDescriptor::character("NAME", 10),
                FieldDescriptor::numeric("N", 3, 0),
            ],
            0,
        )?;
        let mut bytes = header.to_bytes();
        // N becomes a 0-length field
        bytes[32 * 2 + 16] = 0;
        bytes[10] = 11;
        let parsed = Header::parse(&mut &bytes[..], None)?;
        assert_eq!(parsed.header_length(), 97);

        let writer = Writer::new(parsed, Vec::new())?;
        assert_eq!(writer.header().header_length(), 65);
        let written = writer.into_inner()?;
        assert_eq!(written.len(), 65);
        let reader = Reader::new(Cursor::new(written))?;
        assert_eq!(reader.header().field_count(), 1);
        Ok(())
    }

    /// Accepts `limit` bytes, then fails.
    #[derive(Debug)]
    struct FailingWriter {
        written: usize,
        limit: usize,
    }

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.written + buf.len() > self.limit {
                return Err(io::Error::other("disk full"));
            }
            self.written += buf.len();
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn io_failures_name_the_record() -> TestResult {
        let header = header(vec![FieldDescriptor::numeric("N", 3, 0)], 2)?;
        let limit = usize::from(header.header_length()) + 4;
        let mut writer = Writer::new(header, FailingWriter { written: 0, limit })?;
        writer.insert_row(&[Value::Int(1)])?;
        let err = writer.insert_row(&[Value::Int(2)]).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Io);
        assert_eq!(err.to_string(), "Failed to write record 1: disk full");
        Ok(())
    }

    #[test]
    fn header_failures_are_reported() {
        let header = header(vec![FieldDescriptor::numeric("N", 3, 0)], 2).unwrap();
        let err = Writer::new(header, FailingWriter { written: 0, limit: 4 }).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Io);
    }
}
