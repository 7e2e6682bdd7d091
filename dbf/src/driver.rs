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

//! Opening dBase files on disk, either directly or through a [`Driver`] that is opened once in
//! one mode and then closed.

use crate::{
    DbfResult, Error, charset::Charset, header::Header, reader::Reader, types::Value,
    writer::Writer,
};
use log::debug;
use std::{
    fs::File,
    path::{Path, PathBuf},
};

/// Open a dBase file for random access reads.
///
/// `forced_charset` overrides the charset declared by the file.
pub fn open_for_read(path: impl AsRef<Path>, forced_charset: Option<Charset>) -> DbfResult<Reader<File>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::OpenFile(path.to_path_buf(), e))?;
    Reader::builder(file)
        .maybe_charset(forced_charset)
        .build()
        .map_err(|e| Error::File(path.to_path_buf(), e))
}

/// Create, or truncate, a dBase file and write `header` to it.
pub fn open_for_write(path: impl AsRef<Path>, header: Header) -> DbfResult<Writer<File>> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| Error::OpenFile(path.to_path_buf(), e))?;
    Writer::new(header, file).map_err(|e| Error::File(path.to_path_buf(), e))
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Unopened,
    Reading(Reader<File>),
    Writing(Writer<File>),
    Closed,
}

/// A dBase file opened either for reading or for writing.
///
/// A driver starts unopened, is opened exactly once, and ends closed. Calls that do not match
/// the current state fail with an error of [`ErrorCategory::State`](crate::error::ErrorCategory).
/// Errors raised while the file is open carry its path.
#[derive(Debug, Default)]
pub struct Driver {
    state: State,
    path: Option<PathBuf>,
}

impl Driver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_read(&mut self, path: impl AsRef<Path>, forced_charset: Option<Charset>) -> DbfResult<()> {
        self.check_unopened()?;
        let reader = open_for_read(path.as_ref(), forced_charset)?;
        self.opened(path.as_ref(), State::Reading(reader));
        Ok(())
    }

    pub fn open_write(&mut self, path: impl AsRef<Path>, header: Header) -> DbfResult<()> {
        self.check_unopened()?;
        let writer = open_for_write(path.as_ref(), header)?;
        self.opened(path.as_ref(), State::Writing(writer));
        Ok(())
    }

    pub fn insert_row(&mut self, row: &[Value]) -> DbfResult<usize> {
        let result = self.writer()?.insert_row(row);
        self.with_path(result)
    }

    pub fn get_field(&mut self, row: u32, column: usize) -> DbfResult<Value> {
        let result = self.reader()?.get_field_value(row, column);
        self.with_path(result)
    }

    pub fn get_row(&mut self, row: u32) -> DbfResult<Vec<Value>> {
        let result = self.reader()?.get_row(row);
        self.with_path(result)
    }

    /// Number of records declared by the file being read.
    pub fn get_row_count(&mut self) -> DbfResult<u32> {
        Ok(self.reader()?.get_row_count())
    }

    pub fn field_count(&self) -> DbfResult<usize> {
        Ok(self.header()?.field_count())
    }

    pub fn header(&self) -> DbfResult<&Header> {
        match &self.state {
            State::Reading(reader) => Ok(reader.header()),
            State::Writing(writer) => Ok(writer.header()),
            State::Unopened => Err(Error::NotOpened()),
            State::Closed => Err(Error::Closed()),
        }
    }

    /// Bytes taken by the cells of a row, without the deletion flag.
    pub fn estimated_row_size(&self) -> DbfResult<usize> {
        Ok(self
            .header()?
            .fields()
            .iter()
            .map(|f| usize::from(f.length()))
            .sum())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Close the file. Closing an unopened or already closed driver is a no-op.
    pub fn close(&mut self) -> DbfResult<()> {
        let result = match std::mem::take(&mut self.state) {
            State::Unopened => {
                self.state = State::Unopened;
                return Ok(());
            }
            State::Closed => Ok(()),
            State::Reading(mut reader) => {
                reader.close();
                Ok(())
            }
            State::Writing(mut writer) => writer.close(),
        };
        self.state = State::Closed;
        debug!("Closed driver");
        self.with_path(result)
    }

    fn check_unopened(&self) -> DbfResult<()> {
        match self.state {
            State::Unopened => Ok(()),
            State::Closed => Err(Error::Closed()),
            State::Reading(_) | State::Writing(_) => Err(Error::AlreadyOpened()),
        }
    }

    fn opened(&mut self, path: &Path, state: State) {
        let mode = if matches!(state, State::Writing(_)) {
            "writing"
        } else {
            "reading"
        };
        debug!("Opened {} for {mode}", path.display());
        self.path = Some(path.to_path_buf());
        self.state = state;
    }

    fn reader(&mut self) -> DbfResult<&mut Reader<File>> {
        match &mut self.state {
            State::Reading(reader) => Ok(reader),
            State::Writing(_) => Err(Error::WrongMode("read")),
            State::Unopened => Err(Error::NotOpened()),
            State::Closed => Err(Error::Closed()),
        }
    }

    fn writer(&mut self) -> DbfResult<&mut Writer<File>> {
        match &mut self.state {
            State::Writing(writer) => Ok(writer),
            State::Reading(_) => Err(Error::WrongMode("write")),
            State::Unopened => Err(Error::NotOpened()),
            State::Closed => Err(Error::Closed()),
        }
    }

    fn with_path<T>(&self, result: DbfResult<T>) -> DbfResult<T> {
        match (&self.path, result) {
            (Some(path), Err(e)) => Err(Error::File(path.clone(), e)),
            (_, result) => result,
        }
    }
}
