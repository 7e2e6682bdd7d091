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

use std::io::{self, ErrorKind, Read, Seek, SeekFrom};

/// Size of the read-ahead window when none is configured.
pub const DEFAULT_WINDOW_SIZE: usize = 32 * 1024;

/// Caches a contiguous range of the source.
///
/// A request inside the cached range is served from memory, anything else moves the window so
/// that it starts at the requested position.
#[derive(Debug)]
pub(super) struct Window<R> {
    source: R,
    /// Internal buffering to reduce the number of seeks.
    buf: Vec<u8>,
    /// Position in the source of `buf[0]`.
    start: u64,
    size: usize,
}

impl<R: Read + Seek> Window<R> {
    pub(super) fn new(source: R, size: usize) -> Self {
        Window {
            source,
            buf: Vec::new(),
            start: 0,
            size: size.max(1),
        }
    }

    /// The `len` bytes found at `pos` in the source.
    pub(super) fn read_at(&mut self, pos: u64, len: usize) -> io::Result<&[u8]> {
        if !self.contains(pos, len) {
            self.fill(pos, len)?;
        }
        let offset = (pos - self.start) as usize;
        Ok(&self.buf[offset..offset + len])
    }

    fn contains(&self, pos: u64, len: usize) -> bool {
        pos >= self.start && pos + len as u64 <= self.start + self.buf.len() as u64
    }

    fn fill(&mut self, pos: u64, len: usize) -> io::Result<()> {
        self.buf.clear();
        self.start = pos;
        self.source.seek(SeekFrom::Start(pos))?;
        let wanted = self.size.max(len) as u64;
        (&mut self.source).take(wanted).read_to_end(&mut self.buf)?;
        if self.buf.len() < len {
            return Err(io::Error::new(
                ErrorKind::UnexpectedEof,
                format!(
                    "expected {len} bytes at offset {pos}, the source ends after {}",
                    self.buf.len()
                ),
            ));
        }
        Ok(())
    }

    pub(super) fn into_inner(self) -> R {
        self.source
    }
}
