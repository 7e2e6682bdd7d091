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

//! Character sets used for the text stored in dBase files.

use crate::{DbfResult, Error};
use encoding_rs::Encoding;
use log::debug;
use std::{borrow::Cow, fmt, str::FromStr};

/// The charset used to decode and encode field names and `Character` cells.
///
/// dBase III predates Unicode, every file is written in some single or double byte code page. The
/// codec defaults to ISO-8859-1 unless the header's language driver byte names a code page or the
/// caller forces one.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Charset {
    /// ISO-8859-1, where every byte is the code point of the same value.
    Latin1,
    /// Any other charset known to `encoding_rs`.
    Encoding(&'static Encoding),
}

impl Charset {
    pub const DEFAULT: Charset = Charset::Latin1;

    /// Resolve a charset from its name.
    ///
    /// Accepts the WHATWG labels understood by `encoding_rs` as well as the Java style names
    /// (`MS949`, `Cp1252`, `ISO8859_1`, ...) found in older tooling.
    pub fn for_label(label: &str) -> DbfResult<Charset> {
        let normalized = label.trim().to_ascii_lowercase();
        let aliased = match normalized.as_str() {
            "iso-8859-1" | "iso8859-1" | "iso8859_1" | "iso_8859_1" | "8859_1" | "latin1"
            | "l1" => return Ok(Charset::Latin1),
            "ms949" | "cp949" | "x-windows-949" => "euc-kr",
            "ms936" | "cp936" => "gbk",
            "ms932" | "cp932" | "windows-31j" => "shift_jis",
            "ms950" | "cp950" => "big5",
            "cp866" => "ibm866",
            other => match other.strip_prefix("cp") {
                Some(page) if page.starts_with("125") => return Self::windows(page, label),
                _ => other,
            },
        };
        Self::from_encoding_label(aliased, label)
    }

    fn windows(page: &str, label: &str) -> DbfResult<Charset> {
        Self::from_encoding_label(&format!("windows-{page}"), label)
    }

    fn from_encoding_label(encoding_label: &str, label: &str) -> DbfResult<Charset> {
        match Encoding::for_label_no_replacement(encoding_label.as_bytes()) {
            // UTF-16 decodes fine but cannot be written back byte for byte
            Some(encoding) if encoding.output_encoding() == encoding => {
                Ok(Charset::Encoding(encoding))
            }
            _ => Err(Error::UnknownCharset(label.to_string())),
        }
    }

    /// Resolve the charset declared by the language driver id stored at byte 29 of the header.
    ///
    /// Returns `None` when the file does not declare a charset, or declares one this codec has no
    /// decoder for (the DOS code pages 437 and 850 among them); the caller then falls back to its
    /// default.
    pub fn for_language_driver(id: u8) -> Option<Charset> {
        match language_driver_encoding(id) {
            Some(encoding) => Some(Charset::Encoding(encoding)),
            None => {
                if id != 0 {
                    debug!("Ignoring unsupported language driver id 0x{id:02X}");
                }
                None
            }
        }
    }

    /// The language driver id declaring this charset, if dBase has one for it.
    pub fn language_driver(&self) -> Option<u8> {
        match self {
            Charset::Latin1 => None,
            Charset::Encoding(encoding) => LANGUAGE_DRIVERS
                .into_iter()
                .find(|&id| language_driver_encoding(id) == Some(*encoding)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Charset::Latin1 => "ISO-8859-1",
            Charset::Encoding(encoding) => encoding.name(),
        }
    }

    /// Decode raw field bytes into text.
    ///
    /// Malformed sequences are replaced with U+FFFD rather than failing the read.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        match self {
            Charset::Latin1 => match std::str::from_utf8(bytes) {
                Ok(ascii) if bytes.is_ascii() => Cow::Borrowed(ascii),
                _ => Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()),
            },
            Charset::Encoding(encoding) => encoding.decode_without_bom_handling(bytes).0,
        }
    }

    /// Append the encoded form of `text` to `out`.
    ///
    /// Characters the charset cannot represent are written as `?`.
    pub fn encode_into(&self, text: &str, out: &mut Vec<u8>) {
        match self {
            Charset::Latin1 => out.extend(
                text.chars()
                    .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?')),
            ),
            Charset::Encoding(encoding) => {
                let (bytes, _, had_errors) = encoding.encode(text);
                if !had_errors {
                    out.extend_from_slice(&bytes);
                    return;
                }
                // encoding_rs substitutes HTML character references, which would not fit in a
                // fixed width cell, so go character by character instead
                let mut buf = [0u8; 4];
                for c in text.chars() {
                    let (bytes, _, unmappable) = encoding.encode(c.encode_utf8(&mut buf));
                    if unmappable {
                        out.push(b'?');
                    } else {
                        out.extend_from_slice(&bytes);
                    }
                }
            }
        }
    }

    /// Number of bytes `text` occupies once encoded.
    pub fn encoded_len(&self, text: &str) -> usize {
        match self {
            Charset::Latin1 => text.chars().count(),
            Charset::Encoding(encoding) if *encoding == encoding_rs::UTF_8 => text.len(),
            Charset::Encoding(_) => {
                let mut out = Vec::with_capacity(text.len());
                self.encode_into(text, &mut out);
                out.len()
            }
        }
    }
}

/// Ids written for each supported code page, the first one wins when several share an encoding.
const LANGUAGE_DRIVERS: [u8; 8] = [0x57, 0x03, 0x13, 0x26, 0x4D, 0x4F, 0xC8, 0xC9];

fn language_driver_encoding(id: u8) -> Option<&'static Encoding> {
    match id {
        0x03 | 0x57 => Some(encoding_rs::WINDOWS_1252),
        0x13 => Some(encoding_rs::SHIFT_JIS),
        0x26 => Some(encoding_rs::IBM866),
        0x4D => Some(encoding_rs::GBK),
        0x4F => Some(encoding_rs::EUC_KR),
        0xC8 => Some(encoding_rs::WINDOWS_1250),
        0xC9 => Some(encoding_rs::WINDOWS_1251),
        _ => None,
    }
}

impl Default for Charset {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FromStr for Charset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Charset::for_label(s)
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
