//! DTOs and typed-value conversion for the Firebase REST APIs.
//!
//! Firestore wraps every field in a typed value object such as
//! `{"stringValue": "ada"}`. The adapters convert plain JSON maps into that
//! encoding on the way out and back again on the way in, so the domain only
//! ever sees ordinary `serde_json` values. Timestamps decode to their RFC 3339
//! strings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value, json};

const REQUEST_TIME: &str = "REQUEST_TIME";

#[derive(Debug, Deserialize)]
pub(super) struct DocumentDto {
    #[serde(default)]
    pub(super) fields: Map<String, Value>,
}

impl DocumentDto {
    pub(super) fn into_plain_fields(self) -> Result<Map<String, Value>, String> {
        decode_fields(&self.fields)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CommitRequestDto {
    pub(super) writes: Vec<WriteDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WriteDto {
    pub(super) update: DocumentBodyDto,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(super) update_transforms: Vec<FieldTransformDto>,
}

#[derive(Debug, Serialize)]
pub(super) struct DocumentBodyDto {
    pub(super) name: String,
    pub(super) fields: Map<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct FieldTransformDto {
    pub(super) field_path: String,
    pub(super) set_to_server_value: &'static str,
}

impl FieldTransformDto {
    pub(super) fn request_time(field: String) -> Self {
        Self {
            field_path: field,
            set_to_server_value: REQUEST_TIME,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SignInRequestDto<'a> {
    pub(super) email: &'a str,
    pub(super) password: &'a str,
    pub(super) return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SignInResponseDto {
    pub(super) local_id: String,
    #[serde(default)]
    pub(super) email: Option<String>,
    pub(super) id_token: String,
    #[serde(default)]
    pub(super) refresh_token: Option<String>,
}

/// Form body for the secure token exchange; that API uses snake_case names.
#[derive(Debug, Serialize)]
pub(super) struct RefreshRequestDto<'a> {
    pub(super) grant_type: &'static str,
    pub(super) refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct RefreshResponseDto {
    pub(super) id_token: String,
    pub(super) refresh_token: String,
}

/// Google API error envelope: `{"error": {"code": 403, "message": "..."}}`.
#[derive(Debug, Deserialize)]
pub(super) struct ErrorEnvelopeDto {
    pub(super) error: ErrorBodyDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorBodyDto {
    #[serde(default)]
    pub(super) message: Option<String>,
    #[serde(default)]
    pub(super) status: Option<String>,
}

impl ErrorEnvelopeDto {
    /// Best human-readable reason carried by `body`, if it is an envelope.
    pub(super) fn reason(body: &[u8]) -> Option<String> {
        let envelope: Self = serde_json::from_slice(body).ok()?;
        envelope
            .error
            .message
            .or(envelope.error.status)
            .filter(|reason| !reason.trim().is_empty())
    }
}

pub(super) fn encode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), encode_value(value)))
        .collect()
}

fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(flag) => json!({ "booleanValue": flag }),
        Value::Number(number) => match number.as_i64() {
            Some(integer) => json!({ "integerValue": integer.to_string() }),
            None => json!({ "doubleValue": number }),
        },
        Value::String(text) => json!({ "stringValue": text }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

pub(super) fn decode_fields(fields: &Map<String, Value>) -> Result<Map<String, Value>, String> {
    fields
        .iter()
        .map(|(name, value)| {
            decode_value(value)
                .map(|decoded| (name.clone(), decoded))
                .map_err(|reason| format!("field '{name}': {reason}"))
        })
        .collect()
}

fn decode_value(value: &Value) -> Result<Value, String> {
    let Some(typed) = value.as_object() else {
        return Err("expected a typed value object".to_owned());
    };
    let Some((kind, inner)) = typed.iter().next() else {
        return Err("typed value object is empty".to_owned());
    };

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| "booleanValue must be a boolean".to_owned()),
        "integerValue" => decode_integer(inner),
        "doubleValue" => decode_double(inner),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner
            .as_str()
            .map(|text| Value::String(text.to_owned()))
            .ok_or_else(|| format!("{kind} must be a string")),
        "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => inner
            .get("values")
            .and_then(Value::as_array)
            .map_or(Ok(Vec::new()), |values| {
                values.iter().map(decode_value).collect::<Result<Vec<_>, _>>()
            })
            .map(Value::Array),
        "mapValue" => inner
            .get("fields")
            .and_then(Value::as_object)
            .map_or(Ok(Map::new()), decode_fields)
            .map(Value::Object),
        other => Err(format!("unsupported value type '{other}'")),
    }
}

fn decode_integer(inner: &Value) -> Result<Value, String> {
    let parsed = match inner {
        Value::String(text) => text.parse::<i64>().ok(),
        Value::Number(number) => number.as_i64(),
        _ => None,
    };
    parsed
        .map(|integer| Value::Number(integer.into()))
        .ok_or_else(|| "integerValue must be a 64-bit integer".to_owned())
}

fn decode_double(inner: &Value) -> Result<Value, String> {
    let parsed = match inner {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| "doubleValue must be a finite number".to_owned())
}

#[cfg(test)]
mod tests {
    //! Regression coverage for the typed-value codec.
    use super::*;
    use rstest::rstest;

    #[test]
    fn encodes_nested_profile_fields() {
        let mut fields = Map::new();
        fields.insert("name".to_owned(), json!("Ada"));
        fields.insert("age".to_owned(), json!(36));
        fields.insert("weight".to_owned(), json!(61.5));
        fields.insert("allergies".to_owned(), json!(["penicillin"]));
        fields.insert("address".to_owned(), json!({ "city": "Leeds" }));
        fields.insert("notes".to_owned(), Value::Null);

        let encoded = encode_fields(&fields);
        assert_eq!(encoded["name"], json!({ "stringValue": "Ada" }));
        assert_eq!(encoded["age"], json!({ "integerValue": "36" }));
        assert_eq!(encoded["weight"], json!({ "doubleValue": 61.5 }));
        assert_eq!(
            encoded["allergies"],
            json!({ "arrayValue": { "values": [{ "stringValue": "penicillin" }] } })
        );
        assert_eq!(
            encoded["address"],
            json!({ "mapValue": { "fields": { "city": { "stringValue": "Leeds" } } } })
        );
        assert_eq!(encoded["notes"], json!({ "nullValue": null }));
    }

    #[test]
    fn decodes_server_document_into_plain_json() {
        let document: DocumentDto = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/users/u-1",
            "fields": {
                "email": { "stringValue": "ada@example.com" },
                "createdAt": { "timestampValue": "2026-03-01T09:30:00.123456Z" },
                "visits": { "integerValue": "4" },
                "tags": { "arrayValue": {} },
                "contact": { "mapValue": { "fields": { "phone": { "stringValue": "0113" } } } }
            }
        }))
        .expect("document decodes");

        let fields = document.into_plain_fields().expect("fields decode");
        assert_eq!(fields["email"], json!("ada@example.com"));
        assert_eq!(fields["createdAt"], json!("2026-03-01T09:30:00.123456Z"));
        assert_eq!(fields["visits"], json!(4));
        assert_eq!(fields["tags"], json!([]));
        assert_eq!(fields["contact"], json!({ "phone": "0113" }));
    }

    #[rstest]
    #[case::not_an_object(json!("Ada"))]
    #[case::empty(json!({}))]
    #[case::unknown_kind(json!({ "vectorValue": [1, 2] }))]
    #[case::bad_integer(json!({ "integerValue": "many" }))]
    fn rejects_malformed_typed_values(#[case] value: Value) {
        let mut fields = Map::new();
        fields.insert("broken".to_owned(), value);

        let error = decode_fields(&fields).expect_err("decode must fail");
        assert!(error.starts_with("field 'broken'"), "unexpected error: {error}");
    }

    #[test]
    fn commit_request_uses_request_time_transforms() {
        let request = CommitRequestDto {
            writes: vec![WriteDto {
                update: DocumentBodyDto {
                    name: "projects/p/databases/(default)/documents/users/u-1".to_owned(),
                    fields: Map::new(),
                },
                update_transforms: vec![FieldTransformDto::request_time("createdAt".to_owned())],
            }],
        };

        let body = serde_json::to_value(&request).expect("request serialises");
        assert_eq!(
            body["writes"][0]["updateTransforms"],
            json!([{ "fieldPath": "createdAt", "setToServerValue": "REQUEST_TIME" }])
        );
    }

    #[test]
    fn error_reason_prefers_message() {
        let body = br#"{"error":{"code":403,"message":"Missing or insufficient permissions.","status":"PERMISSION_DENIED"}}"#;
        assert_eq!(
            ErrorEnvelopeDto::reason(body).as_deref(),
            Some("Missing or insufficient permissions.")
        );
        assert_eq!(ErrorEnvelopeDto::reason(b"<html>"), None);
    }
}
