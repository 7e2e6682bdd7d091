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

//! Decoding of the fixed width text stored in a record into [`Value`]s.
//!
//! Decoding never fails: bytes that do not form a value of the field's type read as
//! [`Value::Null`].

use crate::{
    charset::Charset,
    schema::{FieldDescriptor, FieldType},
    types::Value,
};
use jiff::civil::Date;
use log::warn;

/// Decode the raw bytes of one cell.
///
/// `raw` is exactly the field's width as stored in the record.
pub fn decode_field(field: &FieldDescriptor, raw: &[u8], charset: Charset) -> Value {
    let text = charset.decode(raw);
    match field.field_type() {
        FieldType::Logical => decode_logical(&text),
        FieldType::Character => decode_character(&text),
        FieldType::Date => decode_date(&text, field.name()),
        FieldType::Numeric if field.decimal_count() == 0 => decode_integer(&text),
        FieldType::Numeric | FieldType::Float => decode_float(&text),
    }
}

/// `T`, `t`, `Y` and `y` are true, `F`, `f`, `N` and `n` are false. Anything else, `?` included,
/// is no value.
pub(crate) fn decode_logical(text: &str) -> Value {
    match text.chars().next() {
        Some('T' | 't' | 'Y' | 'y') => Value::Boolean(true),
        Some('F' | 'f' | 'N' | 'n') => Value::Boolean(false),
        _ => Value::Null,
    }
}

pub(crate) fn decode_character(text: &str) -> Value {
    match text.chars().next() {
        None | Some('\0') => Value::Null,
        Some(_) => Value::String(
            text.trim_matches(|c: char| c == '\0' || c.is_whitespace())
                .to_string(),
        ),
    }
}

/// `YYYYMMDD`. All zeros, blanks and anything that is not eight digits is no value.
pub(crate) fn decode_date(text: &str, field: &str) -> Value {
    let digits = text.trim_matches(is_padding);
    if digits.len() != 8 || !digits.bytes().all(|b| b.is_ascii_digit()) || digits == "00000000" {
        return Value::Null;
    }
    let parts = (
        digits[..4].parse::<i16>(),
        digits[4..6].parse::<i8>(),
        digits[6..].parse::<i8>(),
    );
    let (Ok(year), Ok(month), Ok(day)) = parts else {
        return Value::Null;
    };
    match Date::new(year, month, day) {
        Ok(date) => Value::Date(date),
        Err(e) => {
            warn!("Ignoring invalid date {digits:?} in field {field}: {e}");
            Value::Null
        }
    }
}

/// A `Numeric` cell without decimals: 32 bits when it fits, then 64 bits, then a double.
pub(crate) fn decode_integer(text: &str) -> Value {
    if text.starts_with('*') {
        return Value::Null;
    }
    let number = text.trim_matches(is_padding);
    if let Ok(int) = number.parse::<i32>() {
        Value::Int(int)
    } else if let Ok(long) = number.parse::<i64>() {
        Value::Long(long)
    } else {
        parse_double(number)
    }
}

pub(crate) fn decode_float(text: &str) -> Value {
    if text.starts_with('*') {
        return Value::Null;
    }
    parse_double(text.trim_matches(is_padding))
}

fn parse_double(number: &str) -> Value {
    if let Ok(double) = number.parse::<f64>() {
        return Value::Double(double);
    }
    // Some writers use a locale specific decimal comma
    if number.contains(',') {
        if let Ok(double) = number.replace(',', ".").parse::<f64>() {
            return Value::Double(double);
        }
    }
    Value::Null
}

/// Spaces and control characters, NUL included.
fn is_padding(c: char) -> bool {
    c <= ' '
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("T", Value::Boolean(true))]
    #[case("y", Value::Boolean(true))]
    #[case("n", Value::Boolean(false))]
    #[case("F", Value::Boolean(false))]
    #[case("?", Value::Null)]
    #[case(" ", Value::Null)]
    fn logical(#[case] text: &str, #[case] expected: Value) {
        assert_eq!(decode_logical(text), expected);
    }

    #[rstest]
    #[case("Alice     ", Value::from("Alice"))]
    #[case("  padded \0\0", Value::from("padded"))]
    #[case("          ", Value::from(""))]
    #[case("\0\0\0\0", Value::Null)]
    fn character(#[case] text: &str, #[case] expected: Value) {
        assert_eq!(decode_character(text), expected);
    }

    #[rstest]
    #[case("20240517", Value::Date(date(2024, 5, 17)))]
    #[case("00010101", Value::Date(date(1, 1, 1)))]
    #[case("00000000", Value::Null)]
    #[case("        ", Value::Null)]
    #[case("2024-5-1", Value::Null)]
    #[case("20230231", Value::Null)]
    fn date_cells(#[case] text: &str, #[case] expected: Value) {
        assert_eq!(decode_date(text, "BUILT"), expected);
    }

    #[rstest]
    #[case("12345", Value::Int(12345))]
    #[case("   -1", Value::Int(-1))]
    #[case("\0\0 42", Value::Int(42))]
    #[case("  9999999999", Value::Long(9_999_999_999))]
    #[case("99999999999999999999", Value::Double(1e20))]
    #[case("  1.5", Value::Double(1.5))]
    #[case("*****", Value::Null)]
    #[case("     ", Value::Null)]
    #[case("  abc", Value::Null)]
    fn integer(#[case] text: &str, #[case] expected: Value) {
        assert_eq!(decode_integer(text), expected);
    }

    #[rstest]
    #[case("   3.250", Value::Double(3.25))]
    #[case("   3,250", Value::Double(3.25))]
    #[case("  -0.5", Value::Double(-0.5))]
    #[case("********", Value::Null)]
    #[case("  1,2,3", Value::Null)]
    fn float(#[case] text: &str, #[case] expected: Value) {
        assert_eq!(decode_float(text), expected);
    }

    #[test]
    fn numeric_with_decimals_never_yields_integers() {
        let field = FieldDescriptor::numeric("AREA", 8, 2);
        assert_eq!(
            decode_field(&field, b"   12.00", Charset::Latin1),
            Value::Double(12.0)
        );
        let field = FieldDescriptor::numeric("COUNT", 8, 0);
        assert_eq!(decode_field(&field, b"      12", Charset::Latin1), Value::Int(12));
    }

    #[test]
    fn character_cells_use_the_charset() {
        let korean = Charset::for_label("MS949").unwrap();
        let mut raw = Vec::new();
        korean.encode_into("\u{d55c}\u{ae00}", &mut raw);
        raw.extend_from_slice(b"      ");
        let field = FieldDescriptor::character("NAME", 10);
        assert_eq!(
            decode_field(&field, &raw, korean),
            Value::from("\u{d55c}\u{ae00}")
        );
    }
}
