use serde_json::{Map, Value};

use super::{Codec, FieldValue, Fields};
use crate::utils::{Error, Result};

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, fields: &Fields) -> Result<Vec<u8>> {
        let object: Map<String, Value> = fields
            .iter()
            .map(|(name, value)| {
                let value = match value {
                    FieldValue::Text(s) => Value::String(s.clone()),
                    FieldValue::List(items) => {
                        Value::Array(items.iter().cloned().map(Value::String).collect())
                    }
                };
                (name.clone(), value)
            })
            .collect();

        serde_json::to_vec(&Value::Object(object))
            .map_err(|e| Error::format(format!("json encode: {e}")))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Fields> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| Error::format(format!("json decode: {e}")))?;

        let Value::Object(object) = value else {
            return Err(Error::format("json body is not an object"));
        };

        object
            .into_iter()
            .map(|(name, value)| -> Result<(String, FieldValue)> {
                let field = match value {
                    Value::Array(items) => FieldValue::List(
                        items
                            .into_iter()
                            .map(scalar_to_string)
                            .collect::<Result<Vec<_>>>()?,
                    ),
                    scalar @ (Value::Null
                    | Value::Bool(_)
                    | Value::Number(_)
                    | Value::String(_)
                    | Value::Object(_)) => FieldValue::Text(scalar_to_string(scalar)?),
                };
                Ok((name, field))
            })
            .collect()
    }
}

fn scalar_to_string(value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        Value::Array(_) | Value::Object(_) => {
            Err(Error::format("nested json values are not supported"))
        }
    }
}
