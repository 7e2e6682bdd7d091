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

use dbf_codec::{
    Charset, DbfResult, FieldDescriptor, Header, Reader, Writer,
    error::{Details, ErrorCategory},
    types::Value,
};
use jiff::civil::{Date, date};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::io::Cursor;

type TestResult = anyhow::Result<()>;

fn parcels_header(records: u32) -> DbfResult<Header> {
    Header::builder()
        .fields(vec![
            FieldDescriptor::character("OWNER", 16),
            FieldDescriptor::logical("BUILT"),
            FieldDescriptor::date("SURVEYED"),
            FieldDescriptor::numeric("ROOMS", 4, 0),
            FieldDescriptor::numeric("CADASTRE", 15, 0),
            FieldDescriptor::numeric("AREA", 10, 2),
            FieldDescriptor::float("ELEVATION", 9, 3),
        ])
        .record_count(records)
        .build()
}

/// A row exercising every type, with a missing value every seventh cell.
fn parcel(i: u32) -> Vec<Value> {
    let cells = vec![
        Value::from(format!("owner {i}")),
        Value::from(i % 2 == 0),
        Value::from(Date::new(1950 + (i % 70) as i16, (i % 12) as i8 + 1, (i % 28) as i8 + 1).ok()),
        Value::from((i % 1000) as i32 - 500),
        Value::from(5_000_000_000i64 + i64::from(i)),
        Value::from(f64::from(i) * 1.25),
        Value::from(-f64::from(i) / 8.0),
    ];
    cells
        .into_iter()
        .enumerate()
        .map(|(column, value)| {
            if (i as usize + column) % 7 == 0 {
                Value::Null
            } else {
                value
            }
        })
        .collect()
}

fn write(header: Header, rows: &[Vec<Value>]) -> DbfResult<Vec<u8>> {
    let mut writer = Writer::new(header, Vec::new())?;
    for row in rows {
        writer.insert_row(row)?;
    }
    writer.into_inner()
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(100)]
fn rows_round_trip(#[case] count: u32) -> TestResult {
    let rows: Vec<_> = (0..count).map(parcel).collect();
    let header = parcels_header(count)?;
    let record_length = usize::from(header.record_length());
    let header_length = usize::from(header.header_length());

    let bytes = write(header, &rows)?;
    assert_eq!(bytes.len(), header_length + record_length * count as usize);

    let mut reader = Reader::new(Cursor::new(bytes))?;
    assert_eq!(reader.get_row_count(), count);
    let read: Vec<_> = reader.rows().collect::<DbfResult<_>>()?;
    assert_eq!(read, rows);
    Ok(())
}

#[test]
fn every_record_has_the_same_width() -> TestResult {
    let header = parcels_header(3)?;
    let mut writer = Writer::new(header.clone(), Vec::new())?;
    for row in [parcel(1), vec![Value::Null; 7], parcel(2)] {
        assert_eq!(writer.insert_row(&row)?, usize::from(header.record_length()));
    }
    Ok(())
}

#[test]
fn missing_values_read_back_as_null() -> TestResult {
    let header = Header::builder()
        .fields(vec![
            FieldDescriptor::logical("L"),
            FieldDescriptor::character("C", 5),
            FieldDescriptor::numeric("N", 5, 0),
            FieldDescriptor::numeric("ND", 6, 2),
            FieldDescriptor::float("F", 6, 2),
            FieldDescriptor::date("D"),
        ])
        .record_count(1)
        .build()?;
    let bytes = write(header, &[vec![Value::Null; 6]])?;
    let mut reader = Reader::new(Cursor::new(bytes))?;
    assert_eq!(reader.get_row(0)?, vec![Value::Null; 6]);
    Ok(())
}

#[test]
fn long_text_is_truncated_to_a_prefix() -> TestResult {
    let korean = Charset::for_label("MS949")?;
    let header = Header::builder()
        .fields(vec![FieldDescriptor::character("NAME", 7)])
        .record_count(2)
        .charset(korean)
        .build()?;
    let original = "\u{c11c}\u{c6b8}\u{d2b9}\u{bcc4}\u{c2dc}";
    let bytes = write(
        header,
        &[vec![Value::from(original)], vec![Value::from("abcdefghij")]],
    )?;

    let mut reader = Reader::builder(Cursor::new(bytes)).charset(korean).build()?;
    let first = reader.get_field_value(0, 0)?;
    let text = first.as_str().unwrap_or_default();
    assert_eq!(text, "\u{c11c}\u{c6b8}\u{d2b9}");
    assert!(original.starts_with(text));
    assert_eq!(reader.get_field_value(1, 0)?, Value::from("abcdefg"));
    Ok(())
}

#[test]
fn wide_integers_fall_back_to_64_bits() -> TestResult {
    let header = Header::builder()
        .fields(vec![FieldDescriptor::numeric("ID", 19, 0)])
        .record_count(3)
        .build()?;
    let rows = vec![
        vec![Value::Long(4_294_967_296)],
        vec![Value::Long(i64::MAX)],
        vec![Value::Int(i32::MIN)],
    ];
    let bytes = write(header, &rows)?;
    let mut reader = Reader::new(Cursor::new(bytes))?;
    assert_eq!(reader.get_field_value(0, 0)?, Value::Long(4_294_967_296));
    assert_eq!(reader.get_field_value(1, 0)?, Value::Long(i64::MAX));
    assert_eq!(reader.get_field_value(2, 0)?, Value::Int(i32::MIN));
    Ok(())
}

#[test]
fn oversized_numbers_are_truncated() -> TestResult {
    let header = Header::builder()
        .fields(vec![FieldDescriptor::numeric("N", 3, 0)])
        .record_count(1)
        .build()?;
    let bytes = write(header, &[vec![Value::Int(12345)]])?;
    let mut reader = Reader::new(Cursor::new(bytes))?;
    assert_eq!(reader.get_field_value(0, 0)?, Value::Int(123));
    Ok(())
}

#[test]
fn scenario_character_field() -> TestResult {
    let header = Header::builder()
        .fields(vec![FieldDescriptor::character("NAME", 10)])
        .record_count(1)
        .build()?;
    let header_length = usize::from(header.header_length());
    let bytes = write(header, &[vec![Value::from("Alice")]])?;
    assert_eq!(&bytes[header_length + 1..], b"Alice     ");

    let mut reader = Reader::new(Cursor::new(bytes))?;
    assert_eq!(reader.get_row(0)?, vec![Value::from("Alice")]);
    Ok(())
}

#[test]
fn scenario_numeric_field() -> TestResult {
    let header = Header::builder()
        .fields(vec![FieldDescriptor::numeric("N", 5, 0)])
        .record_count(2)
        .build()?;
    let header_length = usize::from(header.header_length());
    let bytes = write(header, &[vec![Value::Int(12345)], vec![Value::Int(-1)]])?;
    assert_eq!(&bytes[header_length..], b" 12345    -1");
    Ok(())
}

#[test]
fn scenario_missing_terminator() -> TestResult {
    let header = Header::builder()
        .fields(vec![FieldDescriptor::character("NAME", 10)])
        .last_update(date(2024, 1, 1))
        .build()?;
    let mut bytes = header.to_bytes();
    bytes.pop();

    let err = Reader::new(Cursor::new(bytes)).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Format);
    assert!(matches!(err.details(), Details::MissingTerminator { .. }));
    Ok(())
}

#[test]
fn declared_charset_can_be_overridden() -> TestResult {
    let cp1251 = Charset::for_label("cp1251")?;
    let header = Header::builder()
        .fields(vec![FieldDescriptor::character("CITY", 6)])
        .record_count(1)
        .charset(cp1251)
        .build()?;
    let bytes = write(header, &[vec![Value::from("\u{41c}\u{438}\u{43d}\u{441}\u{43a}")]])?;

    // The file declares its code page
    let mut reader = Reader::new(Cursor::new(bytes.clone()))?;
    assert_eq!(reader.header().charset(), cp1251);
    assert_eq!(
        reader.get_field_value(0, 0)?,
        Value::from("\u{41c}\u{438}\u{43d}\u{441}\u{43a}")
    );

    let mut reader = Reader::builder(Cursor::new(bytes))
        .charset(Charset::Latin1)
        .build()?;
    assert_eq!(
        reader.get_field_value(0, 0)?,
        Value::from("\u{cc}\u{e8}\u{ed}\u{f1}\u{ea}")
    );
    Ok(())
}
