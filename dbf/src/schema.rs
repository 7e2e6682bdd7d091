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

//! Logic for describing the columns of a dBase table.

use log::warn;
use serde::{Deserialize, Serialize};
use strum_macros::{EnumIter, IntoStaticStr};

/// Maximum number of characters kept in a field name.
pub const MAX_FIELD_NAME_LENGTH: usize = 10;

/// The dBase III field types.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Hash, EnumIter, IntoStaticStr, Serialize, Deserialize,
)]
pub enum FieldType {
    /// `L`: a boolean.
    Logical,
    /// `C`: left-justified, space padded text.
    Character,
    /// `D`: an 8 digit `YYYYMMDD` date.
    Date,
    /// `N`: right-justified decimal text, integral when the decimal count is 0.
    Numeric,
    /// `F`: right-justified decimal text, always read as a double.
    Float,
}

impl FieldType {
    /// Resolve a type tag as stored in a field descriptor. Lower case tags are accepted.
    pub fn from_tag(tag: u8) -> Option<FieldType> {
        match tag.to_ascii_uppercase() {
            b'L' => Some(FieldType::Logical),
            b'C' => Some(FieldType::Character),
            b'D' => Some(FieldType::Date),
            b'N' => Some(FieldType::Numeric),
            b'F' => Some(FieldType::Float),
            _ => None,
        }
    }

    pub fn tag(&self) -> u8 {
        match self {
            FieldType::Logical => b'L',
            FieldType::Character => b'C',
            FieldType::Date => b'D',
            FieldType::Numeric => b'N',
            FieldType::Float => b'F',
        }
    }

    /// The byte repeated over the whole width of a cell that holds no value.
    pub(crate) fn null_sentinel(&self) -> u8 {
        match self {
            FieldType::Character => b'\0',
            FieldType::Logical => b'?',
            FieldType::Numeric | FieldType::Float => b'*',
            FieldType::Date => b'0',
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Numeric | FieldType::Float)
    }
}

/// Describes one column: its name, type and fixed width.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct FieldDescriptor {
    name: String,
    field_type: FieldType,
    length: u8,
    decimal_count: u8,
}

impl FieldDescriptor {
    /// Describe a column.
    ///
    /// The descriptor is normalised the way dBase III readers expect it, logging a warning for
    /// each adjustment:
    ///
    /// * names longer than 10 characters are truncated,
    /// * `Date` fields are always 8 bytes wide and `Logical` fields 1 byte,
    /// * only `Numeric` and `Float` fields keep a decimal count, which is clamped to leave at
    ///   least one digit before the decimal point.
    ///
    /// A length of 0 is kept here and rejected when the [`Header`](crate::Header) is built.
    pub fn new(name: impl Into<String>, field_type: FieldType, length: u8, decimal_count: u8) -> Self {
        let mut name = name.into();
        if name.chars().count() > MAX_FIELD_NAME_LENGTH {
            let truncated: String = name.chars().take(MAX_FIELD_NAME_LENGTH).collect();
            warn!("Field name {name} is longer than {MAX_FIELD_NAME_LENGTH} characters, truncating to {truncated}");
            name = truncated;
        }

        let mut length = length;
        let mut decimal_count = decimal_count;
        match field_type {
            FieldType::Character => {
                if length > 254 {
                    warn!("Field length for {name} set to {length}, which is longer than 254 and not consistent with dBase III");
                }
            }
            FieldType::Date => {
                if length != 8 {
                    warn!("Field length for {name} set to {length}, setting to 8 digits YYYYMMDD");
                    length = 8;
                }
            }
            FieldType::Logical => {
                if length != 1 {
                    warn!("Field length for {name} set to {length}, setting to 1 for logical fields");
                    length = 1;
                }
            }
            FieldType::Numeric => {
                if length > 18 {
                    warn!("Field length for {name} set to {length}, preserving it although dBase III allows at most 18");
                }
            }
            FieldType::Float => {
                if length > 20 {
                    warn!("Field length for {name} set to {length}, preserving it although dBase IV allows at most 20");
                }
            }
        }

        if field_type.is_numeric() {
            let max_decimals = length.saturating_sub(1);
            if decimal_count > max_decimals {
                warn!("Field decimal count for {name} set to {decimal_count}, setting to {max_decimals}, no integral digits would be saved");
                decimal_count = max_decimals;
            }
        } else {
            decimal_count = 0;
        }

        Self {
            name,
            field_type,
            length,
            decimal_count,
        }
    }

    /// Build a descriptor exactly as stored in a file, without any normalisation.
    pub(crate) fn raw(name: String, field_type: FieldType, length: u8, decimal_count: u8) -> Self {
        Self {
            name,
            field_type,
            length,
            decimal_count,
        }
    }

    pub fn character(name: impl Into<String>, length: u8) -> Self {
        Self::new(name, FieldType::Character, length, 0)
    }

    pub fn numeric(name: impl Into<String>, length: u8, decimal_count: u8) -> Self {
        Self::new(name, FieldType::Numeric, length, decimal_count)
    }

    pub fn float(name: impl Into<String>, length: u8, decimal_count: u8) -> Self {
        Self::new(name, FieldType::Float, length, decimal_count)
    }

    pub fn logical(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Logical, 1, 0)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Date, 8, 0)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn length(&self) -> u8 {
        self.length
    }

    pub fn decimal_count(&self) -> u8 {
        self.decimal_count
    }

    /// The column type a consuming schema layer should use for this field.
    pub fn column_type(&self) -> ColumnType {
        match self.field_type {
            FieldType::Logical => ColumnType::Boolean,
            FieldType::Character => ColumnType::Varchar(self.length),
            FieldType::Date => ColumnType::Date,
            FieldType::Numeric if self.decimal_count == 0 => {
                if self.length < 10 {
                    ColumnType::Integer
                } else {
                    ColumnType::BigInt
                }
            }
            FieldType::Numeric | FieldType::Float => ColumnType::Double,
        }
    }
}

/// Column types on the SQL side of an import or export.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    Double,
    /// Text of at most the given number of bytes.
    Varchar(u8),
    Date,
}

impl ColumnType {
    /// Pick the dBase field able to hold values of this column type.
    ///
    /// `display_size` and `precision` are the width and scale reported by the source column;
    /// they are capped at the limits of the matching dBase type.
    pub fn to_dbf_field(&self, name: impl Into<String>, display_size: u32, precision: u32) -> FieldDescriptor {
        let cap = |limit: u32, size: u32| size.clamp(1, limit) as u8;
        match self {
            ColumnType::Boolean => FieldDescriptor::logical(name),
            ColumnType::SmallInt => FieldDescriptor::numeric(name, cap(5, display_size), 0),
            ColumnType::Integer => FieldDescriptor::numeric(name, cap(10, display_size), 0),
            ColumnType::BigInt => FieldDescriptor::numeric(name, cap(18, display_size), 0),
            // The width includes the decimal separator
            ColumnType::Double => FieldDescriptor::float(
                name,
                cap(20, display_size.saturating_add(1)),
                precision.min(18) as u8,
            ),
            ColumnType::Varchar(length) => {
                FieldDescriptor::character(name, cap(254, u32::from(*length).min(display_size.max(1))))
            }
            ColumnType::Date => FieldDescriptor::date(name),
        }
    }
}
