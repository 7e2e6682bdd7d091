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

//! Encoding of [`Value`]s into fixed width record bytes.
//!
//! Values wider than their field are truncated without error:
//!
//! * `Character` text loses trailing characters until its encoded form fits,
//! * `Numeric` and `Float` text keeps its leftmost `length` characters, so an oversized number
//!   is stored as a different number.
//!
//! Callers that need lossless round trips have to size their fields accordingly.

use crate::{
    DbfResult, Error,
    charset::Charset,
    header::Header,
    schema::{FieldDescriptor, FieldType},
    types::Value,
};
use std::fmt::Write as _;

/// Encodes rows against a header, reusing its buffers from one row to the next.
#[derive(Debug)]
pub(crate) struct RecordEncoder {
    charset: Charset,
    /// Per column, the sentinel bytes written for a missing value.
    null_cells: Vec<Vec<u8>>,
    text: String,
    cell: Vec<u8>,
}

impl RecordEncoder {
    pub(crate) fn new(header: &Header) -> Self {
        let null_cells = header
            .fields()
            .iter()
            .map(|f| vec![f.field_type().null_sentinel(); usize::from(f.length())])
            .collect();
        Self {
            charset: header.charset(),
            null_cells,
            text: String::with_capacity(usize::from(header.largest_field_length()) + 1),
            cell: Vec::with_capacity(usize::from(header.largest_field_length())),
        }
    }

    /// Append a full record, deletion flag included, to `out`.
    pub(crate) fn encode_row(
        &mut self,
        header: &Header,
        row: &[Value],
        out: &mut Vec<u8>,
    ) -> DbfResult<()> {
        if row.len() != header.field_count() {
            return Err(Error::RowArity(header.field_count(), row.len()));
        }
        out.push(b' ');
        for (column, (field, value)) in header.fields().iter().zip(row).enumerate() {
            self.encode_cell(column, field, value, out)?;
        }
        Ok(())
    }

    fn encode_cell(
        &mut self,
        column: usize,
        field: &FieldDescriptor,
        value: &Value,
        out: &mut Vec<u8>,
    ) -> DbfResult<()> {
        let width = usize::from(field.length());
        self.cell.clear();
        if !value.is_null() {
            encode_value(
                field,
                value,
                self.charset,
                &mut self.text,
                &mut self.cell,
            )?;
        }
        if value.is_null() || self.cell.len() != width {
            out.extend_from_slice(&self.null_cells[column]);
        } else {
            out.extend_from_slice(&self.cell);
        }
        Ok(())
    }
}

/// Encode a non-null value into `out`.
///
/// The result may be of the wrong width, e.g. a date outside of years 0 to 9999; the caller
/// stores a missing value instead.
fn encode_value(
    field: &FieldDescriptor,
    value: &Value,
    charset: Charset,
    text: &mut String,
    out: &mut Vec<u8>,
) -> DbfResult<()> {
    let width = usize::from(field.length());
    text.clear();
    match (field.field_type(), value) {
        (FieldType::Logical, Value::Boolean(b)) => out.push(if *b { b'T' } else { b'F' }),
        (FieldType::Character, Value::String(s)) => encode_text(s, width, charset, out),
        (FieldType::Character, other) => {
            let _ = write!(text, "{other}");
            encode_text(text, width, charset, out);
        }
        (FieldType::Date, Value::Date(date)) if date.year() >= 0 => {
            let _ = write!(
                text,
                "{:04}{:02}{:02}",
                date.year(),
                date.month(),
                date.day()
            );
            out.extend_from_slice(text.as_bytes());
        }
        // Negative years have no YYYYMMDD form
        (FieldType::Date, Value::Date(_)) => {}
        (FieldType::Numeric | FieldType::Float, Value::Int(_) | Value::Long(_) | Value::Double(_)) => {
            if format_number(value, field.decimal_count(), text) {
                right_justify(text, width, out);
            }
        }
        (field_type, other) => {
            return Err(Error::ValueKindMismatch(
                field.name().to_string(),
                field_type,
                other.kind(),
            ));
        }
    }
    Ok(())
}

/// Left-justified text padded with spaces. Trailing characters are dropped until the encoded
/// text fits.
fn encode_text(text: &str, width: usize, charset: Charset, out: &mut Vec<u8>) {
    // Every character takes at least one byte
    let mut end = text
        .char_indices()
        .nth(width)
        .map_or(text.len(), |(i, _)| i);
    let start = out.len();
    loop {
        out.truncate(start);
        charset.encode_into(&text[..end], out);
        if out.len() - start <= width {
            break;
        }
        end = text[..end]
            .char_indices()
            .next_back()
            .map_or(0, |(i, _)| i);
    }
    out.resize(start + width, b' ');
}

/// Decimal text with exactly `decimals` digits after the point. Returns `false` for values
/// that have no decimal representation.
fn format_number(value: &Value, decimals: u8, text: &mut String) -> bool {
    let decimals = usize::from(decimals);
    match value {
        Value::Int(i) => {
            let _ = write!(text, "{i}");
        }
        Value::Long(l) => {
            let _ = write!(text, "{l}");
        }
        Value::Double(d) if d.is_finite() => {
            let _ = write!(text, "{d:.decimals$}");
            return true;
        }
        _ => return false,
    }
    if decimals > 0 {
        text.push('.');
        text.extend(std::iter::repeat_n('0', decimals));
    }
    true
}

/// Pad on the left to `width`, or keep the leftmost `width` characters.
fn right_justify(text: &str, width: usize, out: &mut Vec<u8>) {
    let bytes = text.as_bytes();
    if bytes.len() < width {
        out.resize(out.len() + width - bytes.len(), b' ');
        out.extend_from_slice(bytes);
    } else {
        out.extend_from_slice(&bytes[..width]);
    }
}
