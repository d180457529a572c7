//! Attribute value conversion

use crate::error::ValueError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Turns raw attribute text into a JSON value for a target type
pub trait ValueReader: Send + Sync {
    /// `target` is the Rust type name the value is destined for
    fn read(&self, raw: &str, target: &'static str) -> Result<Value, ValueError>;
}

/// Reads JSON literals, treating anything else as a plain string
///
/// `8080` becomes a number, `true` a bool, `[1, 2]` an array and `web-01`
/// the string `"web-01"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonValueReader;

impl ValueReader for JsonValueReader {
    fn read(&self, raw: &str, _target: &'static str) -> Result<Value, ValueError> {
        Ok(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
    }
}

/// Read `raw` through `reader` and deserialize it as `V`
///
/// The reader always runs, so its errors surface unchanged. Targets that
/// accept a string then take the raw text verbatim, and everything else is
/// deserialized from the reader's value. `"quoted"` stays quoted in a
/// `String` field while `8080` still binds to a `u16`.
pub fn read_as<V: DeserializeOwned>(reader: &dyn ValueReader, raw: &str) -> Result<V, ValueError> {
    let target = std::any::type_name::<V>();
    let value = reader.read(raw, target)?;

    if let Ok(verbatim) = serde_json::from_value::<V>(Value::String(raw.to_string())) {
        return Ok(verbatim);
    }
    serde_json::from_value::<V>(value).map_err(|err| ValueError::Unreadable {
        raw: raw.to_string(),
        target,
        message: err.to_string(),
    })
}
