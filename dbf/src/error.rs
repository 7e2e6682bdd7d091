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

use crate::{schema::FieldType, types::ValueKind};
use std::{error::Error as _, fmt, path::PathBuf};

/// Errors encountered while reading or writing dBase files.
///
/// To inspect the details of the error use [`details`](Self::details) or
/// [`into_details`](Self::into_details) to get a [`Details`] which contains more precise error
/// information. [`category`](Self::category) groups the details into the broad classes callers
/// usually branch on.
#[derive(thiserror::Error, Debug)]
#[repr(transparent)]
#[error(transparent)]
pub struct Error {
    details: Box<Details>,
}

impl Error {
    pub fn new(details: Details) -> Self {
        Self {
            details: Box::new(details),
        }
    }

    pub fn details(&self) -> &Details {
        &self.details
    }

    pub fn into_details(self) -> Details {
        *self.details
    }

    /// The broad class this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        self.details.category()
    }
}

/// Functions for constructing a specific error type.
#[allow(non_snake_case, reason = "Want to mimic the `Details` variants")]
impl Error {
    /// Construct a new [`Error`] with a [`Details::ReadHeader`].
    pub(crate) fn ReadHeader(value: std::io::Error) -> Self {
        Self::new(Details::ReadHeader(value))
    }

    /// Construct a new [`Error`] with a [`Details::WriteHeader`].
    pub(crate) fn WriteHeader(value: std::io::Error) -> Self {
        Self::new(Details::WriteHeader(value))
    }

    /// Construct a new [`Error`] with a [`Details::MissingTerminator`].
    pub(crate) fn MissingTerminator(fields_read: usize) -> Self {
        Self::new(Details::MissingTerminator { fields_read })
    }

    /// Construct a new [`Error`] with a [`Details::UnknownFieldType`].
    pub(crate) fn UnknownFieldType(tag: u8, field: String) -> Self {
        Self::new(Details::UnknownFieldType {
            tag: char::from(tag),
            field,
        })
    }

    /// Construct a new [`Error`] with a [`Details::ZeroFieldLength`].
    pub(crate) fn ZeroFieldLength(field: String) -> Self {
        Self::new(Details::ZeroFieldLength(field))
    }

    /// Construct a new [`Error`] with a [`Details::RecordTooLong`].
    pub(crate) fn RecordTooLong(length: usize) -> Self {
        Self::new(Details::RecordTooLong(length))
    }

    /// Construct a new [`Error`] with a [`Details::TooManyFields`].
    pub(crate) fn TooManyFields(count: usize) -> Self {
        Self::new(Details::TooManyFields(count))
    }

    /// Construct a new [`Error`] with a [`Details::UnknownCharset`].
    pub(crate) fn UnknownCharset(label: String) -> Self {
        Self::new(Details::UnknownCharset(label))
    }

    /// Construct a new [`Error`] with a [`Details::RowArity`].
    pub(crate) fn RowArity(expected: usize, actual: usize) -> Self {
        Self::new(Details::RowArity { expected, actual })
    }

    /// Construct a new [`Error`] with a [`Details::ValueKindMismatch`].
    pub(crate) fn ValueKindMismatch(field: String, field_type: FieldType, kind: ValueKind) -> Self {
        Self::new(Details::ValueKindMismatch {
            field,
            field_type,
            kind,
        })
    }

    /// Construct a new [`Error`] with a [`Details::ColumnIndex`].
    pub(crate) fn ColumnIndex(column: usize, field_count: usize) -> Self {
        Self::new(Details::ColumnIndex {
            column,
            field_count,
        })
    }

    /// Construct a new [`Error`] with a [`Details::RowIndex`].
    pub(crate) fn RowIndex(row: u32, record_count: u32) -> Self {
        Self::new(Details::RowIndex { row, record_count })
    }

    /// Construct a new [`Error`] with a [`Details::ReadField`].
    pub(crate) fn ReadField(row: u32, column: usize, field: String, source: std::io::Error) -> Self {
        Self::new(Details::ReadField {
            row,
            column,
            field,
            source,
        })
    }

    /// Construct a new [`Error`] with a [`Details::WriteRecord`].
    pub(crate) fn WriteRecord(row: u64, source: std::io::Error) -> Self {
        Self::new(Details::WriteRecord { row, source })
    }

    /// Construct a new [`Error`] with a [`Details::FlushWriter`].
    pub(crate) fn FlushWriter(value: std::io::Error) -> Self {
        Self::new(Details::FlushWriter(value))
    }

    /// Construct a new [`Error`] with a [`Details::Closed`].
    pub(crate) fn Closed() -> Self {
        Self::new(Details::Closed)
    }

    /// Construct a new [`Error`] with a [`Details::NotOpened`].
    pub(crate) fn NotOpened() -> Self {
        Self::new(Details::NotOpened)
    }

    /// Construct a new [`Error`] with a [`Details::AlreadyOpened`].
    pub(crate) fn AlreadyOpened() -> Self {
        Self::new(Details::AlreadyOpened)
    }

    /// Construct a new [`Error`] with a [`Details::WrongMode`].
    pub(crate) fn WrongMode(expected: &'static str) -> Self {
        Self::new(Details::WrongMode(expected))
    }

    /// Construct a new [`Error`] with a [`Details::File`].
    pub(crate) fn File(path: PathBuf, source: Error) -> Self {
        Self::new(Details::File { path, source })
    }

    /// Construct a new [`Error`] with a [`Details::OpenFile`].
    pub(crate) fn OpenFile(path: PathBuf, source: std::io::Error) -> Self {
        Self::new(Details::OpenFile { path, source })
    }
}

impl From<Details> for Error {
    fn from(details: Details) -> Self {
        Self::new(details)
    }
}

/// Broad classes of [`Error`]s.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorCategory {
    /// The bytes do not describe a valid dBase III header, or a header could not be built.
    Format,
    /// A requested or self-declared charset cannot be resolved.
    Encoding,
    /// A row does not fit the header it is written against.
    ValueMismatch,
    /// The reader, writer or driver is not in a state that allows the operation.
    State,
    /// A row or column index is outside the table.
    Index,
    /// The underlying byte source or sink failed.
    Io,
}

#[derive(thiserror::Error)]
pub enum Details {
    #[error("Failed to read the dBase header: {0}")]
    ReadHeader(#[source] std::io::Error),

    #[error("Failed to write the dBase header: {0}")]
    WriteHeader(#[source] std::io::Error),

    #[error("No 0x0D terminator found after {fields_read} field descriptors")]
    MissingTerminator { fields_read: usize },

    #[error("Unknown field type {tag:?} for field '{field}'")]
    UnknownFieldType { tag: char, field: String },

    #[error("Field '{0}' has a length of 0")]
    ZeroFieldLength(String),

    #[error("Header declares {declared} bytes per record, but its fields add up to {computed}")]
    RecordLengthMismatch { declared: u16, computed: usize },

    #[error("Header declares a header length of {declared} bytes, but {fields} fields need {computed}")]
    HeaderLengthMismatch {
        declared: u16,
        fields: usize,
        computed: usize,
    },

    #[error("Records of {0} bytes do not fit in the 16-bit record length")]
    RecordTooLong(usize),

    #[error("{0} fields do not fit in the 16-bit header length")]
    TooManyFields(usize),

    #[error("Charset '{0}' is not supported")]
    UnknownCharset(String),

    #[error("Wrong number of values in row: expected {expected}, got {actual}")]
    RowArity { expected: usize, actual: usize },

    #[error("Cannot write a {kind:?} value into {field_type:?} field '{field}'")]
    ValueKindMismatch {
        field: String,
        field_type: FieldType,
        kind: ValueKind,
    },

    #[error("Column {column} is out of range, the table has {field_count} fields")]
    ColumnIndex { column: usize, field_count: usize },

    #[error("Row {row} is out of range, the header declares {record_count} records")]
    RowIndex { row: u32, record_count: u32 },

    #[error("Failed to read row {row}, column {column} ('{field}'): {source}")]
    ReadField {
        row: u32,
        column: usize,
        field: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write record {row}: {source}")]
    WriteRecord {
        row: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to flush the underlying writer: {0}")]
    FlushWriter(#[source] std::io::Error),

    #[error("The file has already been closed")]
    Closed,

    #[error("No file has been opened yet")]
    NotOpened,

    #[error("A file is already open")]
    AlreadyOpened,

    #[error("The file is not open in {0} mode")]
    WrongMode(&'static str),

    #[error("Failed to open {}: {source}", .path.display())]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: Error,
    },
}

impl Details {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Details::MissingTerminator { .. }
            | Details::UnknownFieldType { .. }
            | Details::ZeroFieldLength(_)
            | Details::RecordLengthMismatch { .. }
            | Details::HeaderLengthMismatch { .. }
            | Details::RecordTooLong(_)
            | Details::TooManyFields(_) => ErrorCategory::Format,
            // A header cut short is malformed, anything else is a failing source
            Details::ReadHeader(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                ErrorCategory::Format
            }
            Details::UnknownCharset(_) => ErrorCategory::Encoding,
            Details::RowArity { .. } | Details::ValueKindMismatch { .. } => {
                ErrorCategory::ValueMismatch
            }
            Details::Closed
            | Details::NotOpened
            | Details::AlreadyOpened
            | Details::WrongMode(_) => ErrorCategory::State,
            Details::ColumnIndex { .. } | Details::RowIndex { .. } => ErrorCategory::Index,
            Details::ReadHeader(_)
            | Details::WriteHeader(_)
            | Details::ReadField { .. }
            | Details::WriteRecord { .. }
            | Details::FlushWriter(_)
            | Details::OpenFile { .. } => ErrorCategory::Io,
            Details::File { source, .. } => source.category(),
        }
    }
}

impl fmt::Debug for Details {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut msg = self.to_string();
        if let Some(e) = self.source() {
            msg.extend([": ", &e.to_string()]);
        }
        write!(f, "{msg}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn truncated_header_is_a_format_error() {
        let eof = std::io::Error::from(std::io::ErrorKind::UnexpectedEof);
        assert_eq!(Error::ReadHeader(eof).category(), ErrorCategory::Format);

        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert_eq!(Error::ReadHeader(denied).category(), ErrorCategory::Io);
    }

    #[test]
    fn file_context_keeps_inner_category() {
        let err = Error::File(PathBuf::from("roads.dbf"), Error::RowArity(3, 2));
        assert_eq!(err.category(), ErrorCategory::ValueMismatch);
        assert_eq!(
            err.to_string(),
            "roads.dbf: Wrong number of values in row: expected 3, got 2"
        );
    }

    #[test]
    fn unknown_field_type_message_shows_the_tag() {
        let err = Error::UnknownFieldType(b'M', "NOTES".to_string());
        assert_eq!(err.to_string(), "Unknown field type 'M' for field 'NOTES'");
        assert_eq!(err.category(), ErrorCategory::Format);
    }
}
