//! The dynamically-typed SQL scalar value.
//!
//! [`SqlValue`] is a closed sum over the scalar kinds the planner
//! handles. Ordering is total: NULL sorts before everything, members
//! of one type family compare semantically, and values from different
//! families fall back to the [`TypeId`] order, which is stable but
//! not semantically meaningful.

use std::cmp::Ordering;
use std::fmt;
use std::fmt::Write as _;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shardsql_error::{ShardError, ShardResult};

use crate::compare::CompareMode;

/// Ordered discriminant for [`SqlValue`].
///
/// The declaration order defines the cross-family sort order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum TypeId {
    /// SQL NULL.
    Null,
    /// BOOLEAN.
    Boolean,
    /// 8-bit signed integer.
    Tinyint,
    /// 16-bit signed integer.
    Smallint,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Bigint,
    /// Exact decimal.
    Decimal,
    /// 64-bit IEEE 754 float.
    Double,
    /// UTF-8 text.
    Text,
    /// Byte string.
    Bytes,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time of day.
    Timestamp,
}

impl TypeId {
    /// The SQL type name, as used in error messages and explain output.
    #[must_use]
    pub const fn sql_name(self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Boolean => "BOOLEAN",
            Self::Tinyint => "TINYINT",
            Self::Smallint => "SMALLINT",
            Self::Int => "INT",
            Self::Bigint => "BIGINT",
            Self::Decimal => "DECIMAL",
            Self::Double => "DOUBLE",
            Self::Text => "VARCHAR",
            Self::Bytes => "VARBINARY",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Timestamp => "TIMESTAMP",
        }
    }

    /// Whether values of this type belong to the numeric family.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Tinyint | Self::Smallint | Self::Int | Self::Bigint | Self::Decimal | Self::Double
        )
    }
}

/// Type families for same-family comparison. Every numeric width,
/// decimal, and double share one family and compare by numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Null,
    Boolean,
    Numeric,
    Text,
    Bytes,
    Date,
    Time,
    Timestamp,
}

/// A dynamically-typed SQL scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// BOOLEAN.
    Boolean(bool),
    /// TINYINT.
    Tinyint(i8),
    /// SMALLINT.
    Smallint(i16),
    /// INT.
    Int(i32),
    /// BIGINT.
    Bigint(i64),
    /// DECIMAL.
    Decimal(Decimal),
    /// DOUBLE.
    Double(f64),
    /// VARCHAR.
    Text(String),
    /// VARBINARY.
    Bytes(Vec<u8>),
    /// DATE.
    Date(NaiveDate),
    /// TIME.
    Time(NaiveTime),
    /// TIMESTAMP.
    Timestamp(NaiveDateTime),
}

impl SqlValue {
    /// The type discriminant of this value.
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        match self {
            Self::Null => TypeId::Null,
            Self::Boolean(_) => TypeId::Boolean,
            Self::Tinyint(_) => TypeId::Tinyint,
            Self::Smallint(_) => TypeId::Smallint,
            Self::Int(_) => TypeId::Int,
            Self::Bigint(_) => TypeId::Bigint,
            Self::Decimal(_) => TypeId::Decimal,
            Self::Double(_) => TypeId::Double,
            Self::Text(_) => TypeId::Text,
            Self::Bytes(_) => TypeId::Bytes,
            Self::Date(_) => TypeId::Date,
            Self::Time(_) => TypeId::Time,
            Self::Timestamp(_) => TypeId::Timestamp,
        }
    }

    /// Returns true if this is SQL NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    const fn family(&self) -> Family {
        match self {
            Self::Null => Family::Null,
            Self::Boolean(_) => Family::Boolean,
            Self::Tinyint(_)
            | Self::Smallint(_)
            | Self::Int(_)
            | Self::Bigint(_)
            | Self::Decimal(_)
            | Self::Double(_) => Family::Numeric,
            Self::Text(_) => Family::Text,
            Self::Bytes(_) => Family::Bytes,
            Self::Date(_) => Family::Date,
            Self::Time(_) => Family::Time,
            Self::Timestamp(_) => Family::Timestamp,
        }
    }

    /// Total order over values under the given mode.
    ///
    /// NULL sorts before every non-NULL value and compares equal to
    /// itself (the sort order needs this; operator-level NULL
    /// semantics live with comparison evaluation, not here). Within a
    /// family the order is semantic; across families it is the
    /// [`TypeId`] order.
    #[must_use]
    pub fn compare(&self, other: &Self, mode: &CompareMode) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Less,
            (_, Self::Null) => Ordering::Greater,
            _ if self.family() == other.family() => self.compare_within_family(other, mode),
            _ => self.type_id().cmp(&other.type_id()),
        }
    }

    fn compare_within_family(&self, other: &Self, mode: &CompareMode) -> Ordering {
        match (self, other) {
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => mode.compare_text(a, b),
            (Self::Bytes(a), Self::Bytes(b)) => mode.compare_bytes(a, b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Time(a), Self::Time(b)) => a.cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            _ => self.compare_numeric(other),
        }
    }

    /// Numeric-family comparison. Integer widths compare exactly;
    /// decimal joins exactly; a double operand forces float
    /// comparison via `total_cmp`.
    fn compare_numeric(&self, other: &Self) -> Ordering {
        if let (Some(a), Some(b)) = (self.integer_value(), other.integer_value()) {
            return a.cmp(&b);
        }
        match (self, other) {
            (Self::Double(a), Self::Double(b)) => a.total_cmp(b),
            (Self::Double(a), b) => a.total_cmp(&b.approx_f64()),
            (a, Self::Double(b)) => a.approx_f64().total_cmp(b),
            (a, b) => a.exact_decimal().cmp(&b.exact_decimal()),
        }
    }

    /// The value as `i64` when it is an integer width.
    const fn integer_value(&self) -> Option<i64> {
        match self {
            Self::Tinyint(v) => Some(*v as i64),
            Self::Smallint(v) => Some(*v as i64),
            Self::Int(v) => Some(*v as i64),
            Self::Bigint(v) => Some(*v),
            _ => None,
        }
    }

    /// Exact decimal form of an integer or decimal value. Callers
    /// guarantee the value is in the numeric family and not a double.
    fn exact_decimal(&self) -> Decimal {
        match self {
            Self::Decimal(d) => *d,
            _ => self.integer_value().map_or(Decimal::ZERO, Decimal::from),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn approx_f64(&self) -> f64 {
        match self {
            Self::Double(v) => *v,
            Self::Decimal(d) => d.to_f64().unwrap_or(f64::NAN),
            _ => self.integer_value().map_or(f64::NAN, |v| v as f64),
        }
    }

    /// Coerce this value to the target type.
    ///
    /// NULL converts to NULL for any target. A conversion that has no
    /// defined path fails with [`ShardError::InvalidValueClass`];
    /// numeric narrowing that would lose the value fails with
    /// [`ShardError::ValueOutOfRange`]; an unparseable text form
    /// fails with [`ShardError::DataConversion`].
    pub fn convert_to(&self, target: TypeId) -> ShardResult<Self> {
        if self.is_null() {
            return Ok(Self::Null);
        }
        if self.type_id() == target {
            return Ok(self.clone());
        }
        match target {
            TypeId::Boolean => self.to_boolean(),
            TypeId::Tinyint | TypeId::Smallint | TypeId::Int | TypeId::Bigint => {
                self.to_integer_width(target)
            }
            TypeId::Decimal => self.to_decimal(),
            TypeId::Double => self.to_double(),
            TypeId::Text => Ok(Self::Text(self.plain_text())),
            TypeId::Bytes => self.to_bytes(),
            TypeId::Date => self.to_date(),
            TypeId::Time => self.to_time(),
            TypeId::Timestamp => self.to_timestamp(),
            TypeId::Null => Err(self.invalid_class(target)),
        }
    }

    fn to_boolean(&self) -> ShardResult<Self> {
        match self {
            Self::Tinyint(_) | Self::Smallint(_) | Self::Int(_) | Self::Bigint(_) => {
                Ok(Self::Boolean(self.integer_value() != Some(0)))
            }
            Self::Text(s) => match s.trim() {
                t if t.eq_ignore_ascii_case("true") || t.eq_ignore_ascii_case("t") || t == "1" => {
                    Ok(Self::Boolean(true))
                }
                t if t.eq_ignore_ascii_case("false") || t.eq_ignore_ascii_case("f") || t == "0" => {
                    Ok(Self::Boolean(false))
                }
                _ => Err(self.data_conversion(TypeId::Boolean)),
            },
            _ => Err(self.invalid_class(TypeId::Boolean)),
        }
    }

    fn to_integer_width(&self, target: TypeId) -> ShardResult<Self> {
        let wide = match self {
            Self::Boolean(b) => i64::from(*b),
            Self::Tinyint(_) | Self::Smallint(_) | Self::Int(_) | Self::Bigint(_) => {
                self.integer_value().unwrap_or(0)
            }
            Self::Decimal(d) => d
                .trunc()
                .to_i64()
                .ok_or_else(|| self.out_of_range(target))?,
            Self::Double(f) => {
                if !f.is_finite() {
                    return Err(self.data_conversion(target));
                }
                let t = f.trunc();
                if t < -9_223_372_036_854_775_808.0 || t >= 9_223_372_036_854_775_808.0 {
                    return Err(self.out_of_range(target));
                }
                #[allow(clippy::cast_possible_truncation)]
                {
                    t as i64
                }
            }
            Self::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| self.data_conversion(target))?,
            _ => return Err(self.invalid_class(target)),
        };
        self.narrow_integer(wide, target)
    }

    fn narrow_integer(&self, wide: i64, target: TypeId) -> ShardResult<Self> {
        let out_of_range = || self.out_of_range(target);
        Ok(match target {
            TypeId::Tinyint => Self::Tinyint(i8::try_from(wide).map_err(|_| out_of_range())?),
            TypeId::Smallint => Self::Smallint(i16::try_from(wide).map_err(|_| out_of_range())?),
            TypeId::Int => Self::Int(i32::try_from(wide).map_err(|_| out_of_range())?),
            _ => Self::Bigint(wide),
        })
    }

    fn to_decimal(&self) -> ShardResult<Self> {
        match self {
            Self::Boolean(b) => Ok(Self::Decimal(Decimal::from(u8::from(*b)))),
            Self::Tinyint(_) | Self::Smallint(_) | Self::Int(_) | Self::Bigint(_) => Ok(
                Self::Decimal(self.integer_value().map_or(Decimal::ZERO, Decimal::from)),
            ),
            Self::Double(f) => Decimal::from_f64(*f)
                .map(Self::Decimal)
                .ok_or_else(|| self.data_conversion(TypeId::Decimal)),
            Self::Text(s) => s
                .trim()
                .parse::<Decimal>()
                .map(Self::Decimal)
                .map_err(|_| self.data_conversion(TypeId::Decimal)),
            _ => Err(self.invalid_class(TypeId::Decimal)),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn to_double(&self) -> ShardResult<Self> {
        match self {
            Self::Boolean(b) => Ok(Self::Double(if *b { 1.0 } else { 0.0 })),
            Self::Tinyint(_) | Self::Smallint(_) | Self::Int(_) | Self::Bigint(_) => {
                Ok(Self::Double(self.integer_value().unwrap_or(0) as f64))
            }
            Self::Decimal(d) => d
                .to_f64()
                .map(Self::Double)
                .ok_or_else(|| self.data_conversion(TypeId::Double)),
            Self::Text(s) => s
                .trim()
                .parse::<f64>()
                .map(Self::Double)
                .map_err(|_| self.data_conversion(TypeId::Double)),
            _ => Err(self.invalid_class(TypeId::Double)),
        }
    }

    fn to_bytes(&self) -> ShardResult<Self> {
        match self {
            Self::Text(s) => parse_hex(s.trim())
                .map(Self::Bytes)
                .ok_or_else(|| self.data_conversion(TypeId::Bytes)),
            _ => Err(self.invalid_class(TypeId::Bytes)),
        }
    }

    fn to_date(&self) -> ShardResult<Self> {
        match self {
            Self::Timestamp(ts) => Ok(Self::Date(ts.date())),
            Self::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map(Self::Date)
                .map_err(|_| self.data_conversion(TypeId::Date)),
            _ => Err(self.invalid_class(TypeId::Date)),
        }
    }

    fn to_time(&self) -> ShardResult<Self> {
        match self {
            Self::Timestamp(ts) => Ok(Self::Time(ts.time())),
            Self::Text(s) => NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f")
                .map(Self::Time)
                .map_err(|_| self.data_conversion(TypeId::Time)),
            _ => Err(self.invalid_class(TypeId::Time)),
        }
    }

    fn to_timestamp(&self) -> ShardResult<Self> {
        match self {
            Self::Date(d) => Ok(Self::Timestamp(d.and_time(NaiveTime::MIN))),
            Self::Text(s) => NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S%.f")
                .map(Self::Timestamp)
                .map_err(|_| self.data_conversion(TypeId::Timestamp)),
            _ => Err(self.invalid_class(TypeId::Timestamp)),
        }
    }

    /// Plain (unquoted) text form, used by conversion to VARCHAR.
    fn plain_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_owned(),
            Self::Tinyint(v) => v.to_string(),
            Self::Smallint(v) => v.to_string(),
            Self::Int(v) => v.to_string(),
            Self::Bigint(v) => v.to_string(),
            Self::Decimal(d) => d.to_string(),
            Self::Double(v) => fmt_double(*v),
            Self::Text(s) => s.clone(),
            Self::Bytes(b) => hex_upper(b),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::Time(t) => t.format("%H:%M:%S%.f").to_string(),
            Self::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
        }
    }

    /// SQL literal text of this value, for explain output.
    ///
    /// Stable per value: text is quoted and escaped, bytes render as
    /// `X'..'`, temporals carry their keyword prefix.
    #[must_use]
    pub fn sql_literal(&self) -> String {
        self.to_string()
    }

    fn invalid_class(&self, target: TypeId) -> ShardError {
        ShardError::InvalidValueClass {
            expected: target.sql_name(),
            actual: self.type_id().sql_name(),
        }
    }

    fn out_of_range(&self, target: TypeId) -> ShardError {
        ShardError::ValueOutOfRange {
            value: self.plain_text(),
            target: target.sql_name(),
        }
    }

    fn data_conversion(&self, target: TypeId) -> ShardError {
        ShardError::DataConversion {
            value: self.sql_literal(),
            target: target.sql_name(),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            Self::Tinyint(v) => write!(f, "{v}"),
            Self::Smallint(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bigint(v) => write!(f, "{v}"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::Double(v) => f.write_str(&fmt_double(*v)),
            Self::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Bytes(b) => write!(f, "X'{}'", hex_upper(b)),
            Self::Date(d) => write!(f, "DATE '{}'", d.format("%Y-%m-%d")),
            Self::Time(t) => write!(f, "TIME '{}'", t.format("%H:%M:%S%.f")),
            Self::Timestamp(ts) => write!(f, "TIMESTAMP '{}'", ts.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }
}

/// Format a double so the text form always reads back as a double:
/// integral finite values keep a trailing `.0`.
fn fmt_double(v: f64) -> String {
    if v.fract() == 0.0 && v.is_finite() {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

fn hex_upper(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02X}");
    }
    out
}

fn parse_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    let digits: Vec<u8> = s
        .bytes()
        .map(|b| match b {
            b'0'..=b'9' => Some(b - b'0'),
            b'a'..=b'f' => Some(b - b'a' + 10),
            b'A'..=b'F' => Some(b - b'A' + 10),
            _ => None,
        })
        .collect::<Option<_>>()?;
    Some(digits.chunks_exact(2).map(|p| (p[0] << 4) | p[1]).collect())
}
