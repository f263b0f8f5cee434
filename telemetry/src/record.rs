use crate::errors::ValidationError;
use serde::Deserialize;
use serde_json::Value;

/// A telemetry record as posted by the tablet client.
///
/// Every field is kept as a raw JSON value. The client has shipped strings,
/// numbers and nulls for the same keys over time, so interpretation is left
/// to the sanitizer and the coercion helpers. `null` deserializes to `None`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    pub mpu: Option<Value>,
    pub site: Option<Value>,
    pub operator: Option<Value>,
    pub shift: Option<Value>,
    pub date: Option<Value>,
    pub slot: Option<Value>,
    pub activity_code: Option<Value>,
    pub activity_name: Option<Value>,
    pub activity_type: Option<Value>,
    pub device: Option<Value>,
    pub device_id: Option<Value>,
    pub docket: Option<Value>,
    pub lat: Option<Value>,
    pub lon: Option<Value>,
    pub timestamp: Option<Value>,
    pub test: Option<Value>,
}

impl TelemetryRecord {
    /// Parses a request body. Anything other than a JSON object is rejected.
    pub fn from_slice(body: &[u8]) -> Result<Self, ValidationError> {
        Self::from_value(serde_json::from_slice(body)?)
    }

    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Object(_) => Ok(serde_json::from_value(value)?),
            other => Err(ValidationError::InvalidBody(format!(
                "expected a JSON object, got {}",
                json_type(&other)
            ))),
        }
    }

    /// Whether this is a connectivity probe rather than a submission.
    ///
    /// Follows JavaScript truthiness, which is what the client was written
    /// against: `true`, non-zero numbers, non-empty strings and any array or
    /// object count.
    pub fn is_test(&self) -> bool {
        match &self.test {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        }
    }

    /// The activity code, if one was actually sent.
    pub fn activity_code(&self) -> Option<&Value> {
        present(&self.activity_code)
    }

    pub fn activity_name(&self) -> Option<&Value> {
        present(&self.activity_name)
    }

    pub fn activity_type(&self) -> Option<&Value> {
        present(&self.activity_type)
    }

    /// `device` wins over the older `deviceId` key.
    pub fn device(&self) -> Option<&Value> {
        present(&self.device).or_else(|| present(&self.device_id))
    }

    pub fn docket(&self) -> Option<&Value> {
        present(&self.docket)
    }
}

// Empty strings are treated as missing, same as null.
fn present(value: &Option<Value>) -> Option<&Value> {
    match value {
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(v) => Some(v),
        None => None,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_record() {
        let record = TelemetryRecord::from_slice(
            br#"{"activityCode":"3","mpu":"MPU1","deviceId":"tab-7","extra":"ignored"}"#,
        )
        .unwrap();

        assert_eq!(record.activity_code(), Some(&json!("3")));
        assert_eq!(record.mpu, Some(json!("MPU1")));
        assert_eq!(record.device(), Some(&json!("tab-7")));
        assert!(!record.is_test());
    }

    #[test]
    fn test_null_and_empty_are_missing() {
        let record =
            TelemetryRecord::from_slice(br#"{"activityCode":null,"docket":"  "}"#).unwrap();
        assert_eq!(record.activity_code(), None);
        assert_eq!(record.docket(), None);
    }

    #[test]
    fn test_device_preferred_over_device_id() {
        let record =
            TelemetryRecord::from_slice(br#"{"device":"d1","deviceId":"d2"}"#).unwrap();
        assert_eq!(record.device(), Some(&json!("d1")));
    }

    #[test]
    fn test_truthy_test_flag() {
        for (body, expected) in [
            (r#"{"test":true}"#, true),
            (r#"{"test":1}"#, true),
            (r#"{"test":"yes"}"#, true),
            (r#"{"test":{}}"#, true),
            (r#"{"test":false}"#, false),
            (r#"{"test":0}"#, false),
            (r#"{"test":""}"#, false),
            (r#"{"test":null}"#, false),
            (r#"{}"#, false),
        ] {
            let record = TelemetryRecord::from_slice(body.as_bytes()).unwrap();
            assert_eq!(record.is_test(), expected, "body: {body}");
        }
    }

    #[test]
    fn test_rejects_malformed_and_non_objects() {
        assert!(matches!(
            TelemetryRecord::from_slice(b"{not json"),
            Err(ValidationError::InvalidBody(_))
        ));
        assert!(TelemetryRecord::from_slice(b"[1, 2]").is_err());
        let sixteen = serde_json::to_vec(&vec![1; 16]).unwrap();
        assert_eq!(
            TelemetryRecord::from_slice(&sixteen),
            Err(ValidationError::InvalidBody(
                "expected a JSON object, got array".into()
            ))
        );
        assert!(TelemetryRecord::from_slice(b"").is_err());
    }
}
