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

//! A codec for **dBase III** tables, the `.dbf` files that carry the attributes of shapefiles
//! and many other legacy exports.
//!
//! A file is a [`Header`] describing fixed width fields, followed by one fixed width record per
//! row. Cells are moved in and out of the codec as [`Value`](types::Value)s; the sentinel bytes
//! the format uses for missing values only ever surface as [`Value::Null`](types::Value::Null).
//!
//! ```
//! # use dbf_codec::{FieldDescriptor, Header, Reader, Writer, types::Value};
//! # use std::io::Cursor;
//! let header = Header::builder()
//!     .fields(vec![
//!         FieldDescriptor::character("NAME", 10),
//!         FieldDescriptor::numeric("LANES", 2, 0),
//!     ])
//!     .record_count(1)
//!     .build()?;
//!
//! let mut writer = Writer::new(header, Vec::new())?;
//! writer.insert_row(&[Value::from("Main St"), Value::from(2)])?;
//! let bytes = writer.into_inner()?;
//!
//! let mut reader = Reader::new(Cursor::new(bytes))?;
//! assert_eq!(reader.get_field_value(0, 1)?, Value::Int(2));
//! # Ok::<(), dbf_codec::Error>(())
//! ```
//!
//! Files on disk are opened with [`open_for_read`] and [`open_for_write`], or through a
//! [`Driver`].
//!
//! Text is decoded with the charset forced by the caller, else the one declared by the file's
//! language driver byte, else ISO-8859-1. See [`Charset`].
//!
//! Oversized values are truncated when written, never rejected; the [`encode`] module lists the
//! rules.
//!
//! # MSRV
//!
//! The current MSRV is 1.88.0.

mod driver;
mod reader;
mod writer;

pub mod charset;
pub mod decode;
pub mod encode;
pub mod error;
pub mod header;
pub mod schema;
pub mod types;

pub use charset::Charset;
pub use driver::{Driver, open_for_read, open_for_write};
pub use error::Error;
pub use header::Header;
pub use reader::{DEFAULT_WINDOW_SIZE, Reader, Rows};
pub use schema::{ColumnType, FieldDescriptor, FieldType};
pub use writer::{EOF_MARKER, Writer};

/// A convenience type alias for `Result`s with `Error`s.
pub type DbfResult<T> = Result<T, Error>;
