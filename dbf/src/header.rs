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

//! The dBase III file header: a fixed 32 byte preamble followed by one 32 byte descriptor per
//! field and a `0x0D` terminator.
//!
//! ```text
//! offset  size  preamble
//!      0     1  version, 0x03 for dBase III without memo
//!      1     3  last update: year since 1900, month, day
//!      4     4  number of records, little-endian
//!      8     2  header length, little-endian
//!     10     2  record length, little-endian
//!     12    20  reserved, byte 29 holds the language driver id
//!
//! offset  size  field descriptor
//!      0    11  name, NUL padded
//!     11     1  type tag (C, D, F, L, N)
//!     12     4  reserved
//!     16     1  length in bytes
//!     17     1  decimal count
//!     18    14  reserved
//! ```

use crate::{
    DbfResult, Error,
    charset::Charset,
    error::Details,
    schema::{ColumnType, FieldDescriptor, FieldType, MAX_FIELD_NAME_LENGTH},
};
use jiff::civil::Date;
use log::{debug, warn};
use std::{
    fmt,
    io::{ErrorKind, Read, Write},
};

/// Version byte of a dBase III file without memo.
pub const DBASE3_VERSION: u8 = 0x03;
/// Marks the end of the field descriptors.
pub const HEADER_TERMINATOR: u8 = 0x0D;

const PREAMBLE_LENGTH: usize = 32;
const DESCRIPTOR_LENGTH: usize = 32;
const FIELD_NAME_LENGTH: usize = 11;
const LANGUAGE_DRIVER_OFFSET: usize = 29;

/// Schema and layout of a dBase III table.
///
/// A header is either parsed from an existing file with [`Header::parse`] or built for a new one
/// with [`Header::builder`]. The header and record lengths are always derived from the fields.
#[derive(Clone, Debug, PartialEq)]
pub struct Header {
    version: u8,
    last_update: Option<Date>,
    record_count: u32,
    header_length: u16,
    record_length: u16,
    fields: Vec<FieldDescriptor>,
    /// Offset of each field from the start of its record, the deletion flag included.
    offsets: Vec<usize>,
    charset: Charset,
}

#[bon::bon]
impl Header {
    /// Build the header of a new file.
    ///
    /// `record_count` is written verbatim: writers do not update it as rows are appended, so it
    /// has to be known before the first row is written.
    #[builder(finish_fn = build)]
    pub fn builder(
        #[builder(default)] fields: Vec<FieldDescriptor>,
        #[builder(default)] record_count: u32,
        #[builder(default)] charset: Charset,
        /// Defaults to today's date in the system time zone.
        last_update: Option<Date>,
    ) -> DbfResult<Header> {
        if let Some(field) = fields.iter().find(|f| f.length() == 0) {
            return Err(Error::ZeroFieldLength(field.name().to_string()));
        }
        let header_length = header_length_for(fields.len())?;
        let (offsets, record_length) = layout(&fields)?;
        Ok(Header {
            version: DBASE3_VERSION,
            last_update: Some(last_update.unwrap_or_else(today)),
            record_count,
            header_length,
            record_length,
            fields,
            offsets,
            charset,
        })
    }
}

impl Header {
    /// Read a header from the start of a dBase file.
    ///
    /// `forced_charset` takes precedence over the charset declared by the file's language driver
    /// byte, which itself takes precedence over [`Charset::DEFAULT`]. Field names are decoded with
    /// the resulting charset.
    pub fn parse<R: Read>(reader: &mut R, forced_charset: Option<Charset>) -> DbfResult<Header> {
        let mut preamble = [0u8; PREAMBLE_LENGTH];
        reader
            .read_exact(&mut preamble)
            .map_err(Error::ReadHeader)?;

        let version = preamble[0];
        if version != DBASE3_VERSION {
            warn!("Unsupported dBase file type 0x{version:02X}, reading it as dBase III");
        }
        let last_update = decode_last_update(preamble[1], preamble[2], preamble[3]);
        let record_count = u32::from_le_bytes([preamble[4], preamble[5], preamble[6], preamble[7]]);
        let declared_header_length = u16::from_le_bytes([preamble[8], preamble[9]]);
        let declared_record_length = u16::from_le_bytes([preamble[10], preamble[11]]);

        let charset = match forced_charset {
            Some(charset) => charset,
            None => Charset::for_language_driver(preamble[LANGUAGE_DRIVER_OFFSET])
                .unwrap_or_default(),
        };
        debug!("Reading dBase header with charset {charset}");

        let mut fields = Vec::new();
        let mut descriptors = 0;
        let mut descriptor = [0u8; DESCRIPTOR_LENGTH];
        loop {
            read_descriptor_part(reader, &mut descriptor[..1], descriptors)?;
            if descriptor[0] == HEADER_TERMINATOR {
                break;
            }
            read_descriptor_part(reader, &mut descriptor[1..], descriptors)?;
            descriptors += 1;

            let name = decode_field_name(&descriptor[..FIELD_NAME_LENGTH], charset);
            let length = descriptor[16];
            // Some broken shapefile exporters write 0-length fields, other readers ignore them
            if length == 0 {
                warn!("Ignoring field {name} with a length of 0");
                continue;
            }
            let tag = descriptor[11];
            let field_type =
                FieldType::from_tag(tag).ok_or_else(|| Error::UnknownFieldType(tag, name.clone()))?;
            fields.push(FieldDescriptor::raw(name, field_type, length, descriptor[17]));
        }

        let computed_header_length = PREAMBLE_LENGTH + DESCRIPTOR_LENGTH * descriptors + 1;
        if usize::from(declared_header_length) != computed_header_length {
            return Err(Details::HeaderLengthMismatch {
                declared: declared_header_length,
                fields: descriptors,
                computed: computed_header_length,
            }
            .into());
        }
        let (offsets, record_length) = layout(&fields)?;
        if declared_record_length != record_length {
            return Err(Details::RecordLengthMismatch {
                declared: declared_record_length,
                computed: usize::from(record_length),
            }
            .into());
        }

        Ok(Header {
            version,
            last_update,
            record_count,
            header_length: declared_header_length,
            record_length,
            fields,
            offsets,
            charset,
        })
    }

    /// Serialize the header, field descriptors and terminator.
    ///
    /// Descriptors skipped while parsing are not written back, so the serialized header can be
    /// shorter than the parsed one. See [`normalized`](Self::normalized).
    pub fn to_bytes(&self) -> Vec<u8> {
        let header_length = serialized_header_length(self.fields.len());
        let mut bytes = Vec::with_capacity(header_length);

        let last_update = self.last_update.unwrap_or_else(today);
        bytes.push(DBASE3_VERSION);
        bytes.push(u8::try_from(last_update.year().saturating_sub(1900).max(0)).unwrap_or(u8::MAX));
        bytes.push(last_update.month() as u8);
        bytes.push(last_update.day() as u8);
        bytes.extend_from_slice(&self.record_count.to_le_bytes());
        bytes.extend_from_slice(&(header_length as u16).to_le_bytes());
        bytes.extend_from_slice(&self.record_length.to_le_bytes());
        bytes.resize(PREAMBLE_LENGTH, 0);
        bytes[LANGUAGE_DRIVER_OFFSET] = self.charset.language_driver().unwrap_or(0);

        for field in &self.fields {
            let start = bytes.len();
            bytes.extend(encode_field_name(field.name(), self.charset));
            bytes.resize(start + FIELD_NAME_LENGTH, 0);
            bytes.push(field.field_type().tag());
            bytes.extend_from_slice(&[0; 4]);
            bytes.push(field.length());
            bytes.push(field.decimal_count());
            bytes.resize(start + DESCRIPTOR_LENGTH, 0);
        }
        bytes.push(HEADER_TERMINATOR);
        bytes
    }

    /// Write the serialized header, returning the number of bytes written.
    pub fn write<W: Write>(&self, writer: &mut W) -> DbfResult<usize> {
        let bytes = self.to_bytes();
        writer.write_all(&bytes).map_err(Error::WriteHeader)?;
        Ok(bytes.len())
    }

    /// Replace the charset used for field names and `Character` cells.
    ///
    /// This is the only change a header accepts, and it has to happen before a reader or writer
    /// starts using it.
    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// The header with its length matching [`to_bytes`](Self::to_bytes), for headers parsed from
    /// files that carried 0-length descriptors.
    pub fn normalized(mut self) -> Self {
        // Never longer than the parsed length, which fitted in 16 bits
        self.header_length = serialized_header_length(self.fields.len()) as u16;
        self
    }

    /// The same schema with another record count, for writers that learn the row count late.
    pub fn with_record_count(mut self, record_count: u32) -> Self {
        self.record_count = record_count;
        self
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// Date of the last update, if the file stores a valid one.
    pub fn last_update(&self) -> Option<Date> {
        self.last_update
    }

    /// Number of records declared by the header. It is not checked against the file size.
    pub fn record_count(&self) -> u32 {
        self.record_count
    }

    /// Length of the header as declared by the file it was parsed from, 0-length descriptors
    /// included.
    pub fn header_length(&self) -> u16 {
        self.header_length
    }

    /// Length of a record in bytes, the deletion flag included.
    pub fn record_length(&self) -> u16 {
        self.record_length
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&FieldDescriptor> {
        self.fields.get(index)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Offset of a field from the start of its record, the deletion flag included.
    pub fn field_offset(&self, index: usize) -> Option<usize> {
        self.offsets.get(index).copied()
    }

    /// Position of a cell from the start of the file.
    pub fn cell_position(&self, row: u32, column: usize) -> Option<u64> {
        let offset = self.field_offset(column)?;
        Some(
            u64::from(self.header_length)
                + u64::from(row) * u64::from(self.record_length)
                + offset as u64,
        )
    }

    /// Position of the deletion flag of a record from the start of the file.
    pub fn record_position(&self, row: u32) -> u64 {
        u64::from(self.header_length) + u64::from(row) * u64::from(self.record_length)
    }

    /// Look up a field by name, ignoring case and surrounding blanks.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.fields
            .iter()
            .position(|f| f.name().eq_ignore_ascii_case(name))
    }

    pub fn largest_field_length(&self) -> u8 {
        self.fields.iter().map(FieldDescriptor::length).max().unwrap_or(0)
    }

    pub fn column_types(&self) -> Vec<ColumnType> {
        self.fields.iter().map(FieldDescriptor::column_type).collect()
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DB3 Header")?;
        match self.last_update {
            Some(date) => writeln!(f, "Date : {date}")?,
            None => writeln!(f, "Date : unknown")?,
        }
        writeln!(f, "Records : {}", self.record_count)?;
        writeln!(f, "Fields : {}", self.fields.len())?;
        for (field, offset) in self.fields.iter().zip(&self.offsets) {
            writeln!(
                f,
                "{} {} {} {} {}",
                field.name(),
                char::from(field.field_type().tag()),
                field.length(),
                field.decimal_count(),
                offset
            )?;
        }
        Ok(())
    }
}

fn serialized_header_length(field_count: usize) -> usize {
    PREAMBLE_LENGTH + DESCRIPTOR_LENGTH * field_count + 1
}

fn header_length_for(field_count: usize) -> DbfResult<u16> {
    u16::try_from(serialized_header_length(field_count))
        .map_err(|_| Error::TooManyFields(field_count))
}

/// Field offsets and the total record length.
fn layout(fields: &[FieldDescriptor]) -> DbfResult<(Vec<usize>, u16)> {
    let mut offsets = Vec::with_capacity(fields.len());
    // Every record starts with the deletion flag
    let mut length = 1usize;
    for field in fields {
        offsets.push(length);
        length += usize::from(field.length());
    }
    let record_length = u16::try_from(length).map_err(|_| Error::RecordTooLong(length))?;
    Ok((offsets, record_length))
}

/// Fill `buf` from the descriptor block. Running out of bytes means the terminator is missing.
fn read_descriptor_part<R: Read>(reader: &mut R, buf: &mut [u8], fields_read: usize) -> DbfResult<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            Error::MissingTerminator(fields_read)
        } else {
            Error::ReadHeader(e)
        }
    })
}

fn decode_field_name(bytes: &[u8], charset: Charset) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    charset.decode(&bytes[..end]).trim().to_string()
}

/// Encode a name in at most 10 bytes, so at least one NUL always follows it.
fn encode_field_name(name: &str, charset: Charset) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(FIELD_NAME_LENGTH);
    let mut scratch = Vec::with_capacity(4);
    let mut buf = [0u8; 4];
    for c in name.chars() {
        scratch.clear();
        charset.encode_into(c.encode_utf8(&mut buf), &mut scratch);
        if encoded.len() + scratch.len() > MAX_FIELD_NAME_LENGTH {
            break;
        }
        encoded.extend_from_slice(&scratch);
    }
    encoded
}

/// The year byte counts from 1900, but some writers stored `year % 100`.
fn decode_last_update(year: u8, month: u8, day: u8) -> Option<Date> {
    let year = if year > 90 {
        1900 + i16::from(year)
    } else {
        2000 + i16::from(year)
    };
    match Date::new(year, month as i8, day as i8) {
        Ok(date) => Some(date),
        Err(e) => {
            debug!("Ignoring invalid last update date {year}-{month}-{day}: {e}");
            None
        }
    }
}

fn today() -> Date {
    jiff::Zoned::now().date()
}
