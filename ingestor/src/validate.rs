use crate::errors::{Error, Result};
use crate::model::{TelemetryPayload, TelemetryReading, Timestamp};
use serde::Deserialize;
use serde_json::Value;

/// Parses the raw request body. Any syntax error, including an empty body,
/// is a malformed request.
pub fn parse_body(body: &[u8]) -> Result<Value> {
    serde_json::from_slice(body).map_err(Error::MalformedRequest)
}

/// Validates a parsed body into a reading.
///
/// `DeviceID` must be a non-empty string and `Timestamp` a non-empty string or
/// a non-zero number. `Status` only has to be present: any non-null value
/// passes, including `0`, `false` and `""`.
pub fn validate(body: &Value) -> Result<TelemetryReading> {
    if !body.is_object() {
        return Err(Error::Validation("Body must be a JSON object".to_string()));
    }
    let payload = TelemetryPayload::deserialize(body)
        .map_err(|e| Error::Validation(format!("Body is not a telemetry object: {}", e)))?;

    let device_id = match payload.device_id {
        Some(Value::String(id)) if !id.is_empty() => id,
        Some(Value::String(_)) => {
            return Err(Error::Validation("DeviceID cannot be empty".to_string()))
        }
        Some(other) => {
            return Err(Error::Validation(format!(
                "DeviceID must be a string, got {}",
                other
            )))
        }
        None => return Err(Error::Validation("DeviceID is missing".to_string())),
    };

    let status = payload
        .status
        .ok_or_else(|| Error::Validation("Status is missing".to_string()))?;

    let timestamp = match payload.timestamp {
        Some(Value::String(ts)) if !ts.is_empty() => Timestamp::Text(ts),
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => Timestamp::Number(n),
        Some(Value::String(_)) => {
            return Err(Error::Validation("Timestamp cannot be empty".to_string()))
        }
        Some(Value::Number(_)) => {
            return Err(Error::Validation("Timestamp cannot be zero".to_string()))
        }
        Some(other) => {
            return Err(Error::Validation(format!(
                "Timestamp must be a string or number, got {}",
                other
            )))
        }
        None => return Err(Error::Validation("Timestamp is missing".to_string())),
    };

    Ok(TelemetryReading {
        device_id,
        status,
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reason(result: Result<TelemetryReading>) -> String {
        match result {
            Err(Error::Validation(reason)) => reason,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_reading() {
        let body = json!({"DeviceID": "esp32-1", "Status": 1, "Timestamp": "2024-01-01T00:00:00Z"});
        let reading = validate(&body).unwrap();

        assert_eq!(reading.device_id, "esp32-1");
        assert_eq!(reading.status, json!(1));
        assert_eq!(
            reading.timestamp,
            Timestamp::Text("2024-01-01T00:00:00Z".to_string())
        );
    }

    #[test]
    fn test_falsy_status_is_present() {
        for status in [json!(0), json!(""), json!(false), json!([])] {
            let body = json!({"DeviceID": "esp32-1", "Status": status.clone(), "Timestamp": "t"});
            assert_eq!(validate(&body).unwrap().status, status);
        }
    }

    #[test]
    fn test_null_status_is_absent() {
        let body = json!({"DeviceID": "esp32-1", "Status": null, "Timestamp": "t"});
        assert_eq!(reason(validate(&body)), "Status is missing");

        let body = json!({"DeviceID": "esp32-1", "Timestamp": "t"});
        assert_eq!(reason(validate(&body)), "Status is missing");
    }

    #[test]
    fn test_empty_device_id() {
        let body = json!({"DeviceID": "", "Status": 1, "Timestamp": "t"});
        assert_eq!(reason(validate(&body)), "DeviceID cannot be empty");
    }

    #[test]
    fn test_non_string_device_id() {
        let body = json!({"DeviceID": 42, "Status": 1, "Timestamp": "t"});
        assert!(reason(validate(&body)).starts_with("DeviceID must be a string"));
    }

    #[test]
    fn test_empty_timestamp() {
        let body = json!({"DeviceID": "esp32-1", "Status": 1, "Timestamp": ""});
        assert_eq!(reason(validate(&body)), "Timestamp cannot be empty");
    }

    #[test]
    fn test_numeric_timestamp() {
        let body = json!({"DeviceID": "esp32-1", "Status": 0, "Timestamp": 1704067200});
        let reading = validate(&body).unwrap();
        assert_eq!(reading.timestamp.to_string(), "1704067200");
    }

    #[test]
    fn test_zero_timestamp() {
        let body = json!({"DeviceID": "esp32-1", "Status": 1, "Timestamp": 0});
        assert_eq!(reason(validate(&body)), "Timestamp cannot be zero");

        let body = json!({"DeviceID": "esp32-1", "Status": 1, "Timestamp": 0.0});
        assert_eq!(reason(validate(&body)), "Timestamp cannot be zero");
    }

    #[test]
    fn test_non_object_body() {
        // Arrays would otherwise fill the struct positionally.
        let body = json!(["esp32-1", 1, "t"]);
        assert_eq!(reason(validate(&body)), "Body must be a JSON object");
        assert_eq!(reason(validate(&json!("esp32-1"))), "Body must be a JSON object");
    }

    #[test]
    fn test_parse_body_rejects_garbage() {
        assert!(matches!(
            parse_body(b"not valid json"),
            Err(Error::MalformedRequest(_))
        ));
        assert!(matches!(parse_body(b""), Err(Error::MalformedRequest(_))));
    }
}
