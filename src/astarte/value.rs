use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Number, Value};
use tracing::warn;

use crate::datetime::{format_timestamp, parse_timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AstarteDataType {
    Double,
    Integer,
    Boolean,
    LongInteger,
    String,
    BinaryBlob,
    DateTime,
    DoubleArray,
    IntegerArray,
    BooleanArray,
    LongIntegerArray,
    StringArray,
    BinaryBlobArray,
    DateTimeArray,
    #[serde(other)]
    Unknown,
}

impl AstarteDataType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Double => "double",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::LongInteger => "longinteger",
            Self::String => "string",
            Self::BinaryBlob => "binaryblob",
            Self::DateTime => "datetime",
            Self::DoubleArray => "doublearray",
            Self::IntegerArray => "integerarray",
            Self::BooleanArray => "booleanarray",
            Self::LongIntegerArray => "longintegerarray",
            Self::StringArray => "stringarray",
            Self::BinaryBlobArray => "binaryblobarray",
            Self::DateTimeArray => "datetimearray",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AstarteDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value published on a mapping. The variant carries the data type, so a
/// value always has the shape its type announces.
#[derive(Debug, Clone, PartialEq)]
pub enum AstarteValue {
    Double(f64),
    Integer(i32),
    Boolean(bool),
    LongInteger(i64),
    String(String),
    BinaryBlob(Vec<u8>),
    DateTime(DateTime<Utc>),
    DoubleArray(Vec<f64>),
    IntegerArray(Vec<i32>),
    BooleanArray(Vec<bool>),
    LongIntegerArray(Vec<i64>),
    StringArray(Vec<String>),
    BinaryBlobArray(Vec<Vec<u8>>),
    DateTimeArray(Vec<DateTime<Utc>>),
}

impl AstarteValue {
    /// Reads a raw JSON value as `data_type`. Values that cannot be read as
    /// their declared type are kept as an opaque string.
    pub fn from_json(data_type: AstarteDataType, value: &Value) -> Self {
        Self::try_from_json(data_type, value).unwrap_or_else(|| {
            warn!(?data_type, %value, "value does not match its mapping type");
            Self::String(opaque_string(value))
        })
    }

    fn try_from_json(data_type: AstarteDataType, value: &Value) -> Option<Self> {
        use AstarteDataType as Type;

        let value = match data_type {
            Type::Double => Self::Double(as_double(value)?),
            Type::Integer => Self::Integer(as_integer(value)?),
            Type::Boolean => Self::Boolean(value.as_bool()?),
            Type::LongInteger => Self::LongInteger(as_long_integer(value)?),
            Type::String => Self::String(value.as_str()?.to_string()),
            Type::BinaryBlob => Self::BinaryBlob(as_binary_blob(value)?),
            Type::DateTime => Self::DateTime(parse_timestamp(value)?),
            Type::DoubleArray => Self::DoubleArray(as_array(value, as_double)?),
            Type::IntegerArray => Self::IntegerArray(as_array(value, as_integer)?),
            Type::BooleanArray => Self::BooleanArray(as_array(value, Value::as_bool)?),
            Type::LongIntegerArray => Self::LongIntegerArray(as_array(value, as_long_integer)?),
            Type::StringArray => Self::StringArray(as_array(value, |item| {
                item.as_str().map(ToString::to_string)
            })?),
            Type::BinaryBlobArray => Self::BinaryBlobArray(as_array(value, as_binary_blob)?),
            Type::DateTimeArray => Self::DateTimeArray(as_array(value, parse_timestamp)?),
            Type::Unknown => return None,
        };

        Some(value)
    }

    pub fn data_type(&self) -> AstarteDataType {
        use AstarteDataType as Type;

        match self {
            Self::Double(_) => Type::Double,
            Self::Integer(_) => Type::Integer,
            Self::Boolean(_) => Type::Boolean,
            Self::LongInteger(_) => Type::LongInteger,
            Self::String(_) => Type::String,
            Self::BinaryBlob(_) => Type::BinaryBlob,
            Self::DateTime(_) => Type::DateTime,
            Self::DoubleArray(_) => Type::DoubleArray,
            Self::IntegerArray(_) => Type::IntegerArray,
            Self::BooleanArray(_) => Type::BooleanArray,
            Self::LongIntegerArray(_) => Type::LongIntegerArray,
            Self::StringArray(_) => Type::StringArray,
            Self::BinaryBlobArray(_) => Type::BinaryBlobArray,
            Self::DateTimeArray(_) => Type::DateTimeArray,
        }
    }

    /// The value in the JSON shape used by the Astarte APIs: long integers
    /// as decimal strings, binary blobs as base64, date times as RFC 3339.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Double(value) => double_to_json(*value),
            Self::Integer(value) => Value::from(*value),
            Self::Boolean(value) => Value::Bool(*value),
            Self::LongInteger(value) => Value::String(value.to_string()),
            Self::String(value) => Value::String(value.clone()),
            Self::BinaryBlob(value) => Value::String(STANDARD.encode(value)),
            Self::DateTime(value) => Value::String(format_timestamp(*value)),
            Self::DoubleArray(values) => values.iter().copied().map(double_to_json).collect(),
            Self::IntegerArray(values) => values.iter().copied().map(Value::from).collect(),
            Self::BooleanArray(values) => values.iter().copied().map(Value::Bool).collect(),
            Self::LongIntegerArray(values) => values
                .iter()
                .map(|value| Value::String(value.to_string()))
                .collect(),
            Self::StringArray(values) => values.iter().cloned().map(Value::String).collect(),
            Self::BinaryBlobArray(values) => values
                .iter()
                .map(|value| Value::String(STANDARD.encode(value)))
                .collect(),
            Self::DateTimeArray(values) => values
                .iter()
                .map(|value| Value::String(format_timestamp(*value)))
                .collect(),
        }
    }
}

impl Serialize for AstarteValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Display for AstarteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_json() {
            Value::String(value) => f.write_str(&value),
            value => write!(f, "{value}"),
        }
    }
}

fn double_to_json(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

fn opaque_string(value: &Value) -> String {
    match value {
        Value::String(value) => value.clone(),
        value => value.to_string(),
    }
}

fn as_double(value: &Value) -> Option<f64> {
    value.as_f64()
}

fn as_integer(value: &Value) -> Option<i32> {
    value.as_i64().and_then(|value| i32::try_from(value).ok())
}

fn as_long_integer(value: &Value) -> Option<i64> {
    match value {
        Value::String(value) => value.parse().ok(),
        value => value.as_i64(),
    }
}

fn as_binary_blob(value: &Value) -> Option<Vec<u8>> {
    STANDARD.decode(value.as_str()?).ok()
}

fn as_array<T>(value: &Value, item: impl Fn(&Value) -> Option<T>) -> Option<Vec<T>> {
    value.as_array()?.iter().map(item).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_data_type_names() {
        let data_type: AstarteDataType = serde_json::from_value(json!("longinteger")).unwrap();
        assert_eq!(data_type, AstarteDataType::LongInteger);

        let data_type: AstarteDataType = serde_json::from_value(json!("datetimearray")).unwrap();
        assert_eq!(data_type, AstarteDataType::DateTimeArray);

        let data_type: AstarteDataType = serde_json::from_value(json!("quaternion")).unwrap();
        assert_eq!(data_type, AstarteDataType::Unknown);

        assert_eq!(
            serde_json::to_value(AstarteDataType::BinaryBlobArray).unwrap(),
            json!(AstarteDataType::BinaryBlobArray.as_str())
        );
        assert_eq!(AstarteDataType::LongInteger.to_string(), "longinteger");
    }

    #[test]
    fn test_scalars() {
        assert_eq!(
            AstarteValue::from_json(AstarteDataType::Double, &json!(81)),
            AstarteValue::Double(81.0)
        );
        assert_eq!(
            AstarteValue::from_json(AstarteDataType::Integer, &json!(-3)),
            AstarteValue::Integer(-3)
        );
        assert_eq!(
            AstarteValue::from_json(AstarteDataType::LongInteger, &json!("9007199254740993")),
            AstarteValue::LongInteger(9_007_199_254_740_993)
        );
        assert_eq!(
            AstarteValue::from_json(AstarteDataType::BinaryBlob, &json!("aGVsbG8=")),
            AstarteValue::BinaryBlob(b"hello".to_vec())
        );
        assert_eq!(
            AstarteValue::from_json(AstarteDataType::Boolean, &json!(true)),
            AstarteValue::Boolean(true)
        );
    }

    #[test]
    fn test_datetime() {
        let value = AstarteValue::from_json(
            AstarteDataType::DateTime,
            &json!("2020-10-14T12:27:02.331Z"),
        );

        assert_eq!(value.data_type(), AstarteDataType::DateTime);
        assert_eq!(value.to_json(), json!("2020-10-14T12:27:02.331Z"));
    }

    #[test]
    fn test_arrays() {
        assert_eq!(
            AstarteValue::from_json(AstarteDataType::DoubleArray, &json!([1, 2.5])),
            AstarteValue::DoubleArray(vec![1.0, 2.5])
        );
        assert_eq!(
            AstarteValue::from_json(AstarteDataType::LongIntegerArray, &json!(["1", 2])),
            AstarteValue::LongIntegerArray(vec![1, 2])
        );
        assert_eq!(
            AstarteValue::from_json(AstarteDataType::StringArray, &json!(["a", "b"])).to_json(),
            json!(["a", "b"])
        );
    }

    #[test]
    fn test_mismatch_falls_back_to_string() {
        let value = AstarteValue::from_json(AstarteDataType::Integer, &json!("not a number"));
        assert_eq!(value, AstarteValue::String("not a number".to_string()));
        assert_eq!(value.data_type(), AstarteDataType::String);

        let value = AstarteValue::from_json(AstarteDataType::Integer, &json!(5_000_000_000_i64));
        assert_eq!(value, AstarteValue::String("5000000000".to_string()));

        let value = AstarteValue::from_json(AstarteDataType::BooleanArray, &json!([true, 1]));
        assert_eq!(value, AstarteValue::String("[true,1]".to_string()));

        let value = AstarteValue::from_json(AstarteDataType::Unknown, &json!({"x": 1}));
        assert_eq!(value, AstarteValue::String(r#"{"x":1}"#.to_string()));
    }

    #[test]
    fn test_display() {
        assert_eq!(AstarteValue::String("on".to_string()).to_string(), "on");
        assert_eq!(AstarteValue::LongInteger(42).to_string(), "42");
        assert_eq!(AstarteValue::Double(0.5).to_string(), "0.5");
        assert_eq!(AstarteValue::IntegerArray(vec![1, 2]).to_string(), "[1,2]");
    }
}
