//! JSON protocol.
//!
//! - Build: Params serialized as the JSON body, with `null` members dropped
//! - Unmarshal: the body decoded into Data; an empty body leaves Data zero
//! - UnmarshalError: `__type` / `code` and `message` / `Message` decoded into
//!   [`Error::Response`]
//!
//! When the service config has a `target_prefix`, requests are JSON-RPC
//! style: `X-Amz-Target: <prefix>.<operation>` and an
//! `application/x-amz-json-1.1` content type.

use reqchain_core::{Error, NamedHandler, Request};
use serde_json::Value;

/// Name of the Build step installed by [`build_handler`]
pub const BUILD_HANDLER: &str = "reqchain.json.Build";
/// Name of the Unmarshal step installed by [`unmarshal_handler`]
pub const UNMARSHAL_HANDLER: &str = "reqchain.json.Unmarshal";
/// Name of the UnmarshalError step installed by [`unmarshal_error_handler`]
pub const UNMARSHAL_ERROR_HANDLER: &str = "reqchain.json.UnmarshalError";

const JSON_CONTENT_TYPE: &str = "application/json";
const JSON_RPC_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Build step: serializes Params into the request body.
#[must_use]
pub fn build_handler() -> NamedHandler {
    NamedHandler::new(BUILD_HANDLER, |request: &mut Request| {
        if request.error.is_some() {
            return;
        }

        let body = match request.params.to_json() {
            Ok(value) => strip_nulls(value),
            Err(e) => {
                request.error = Some(Error::Build(format!("failed to serialize params: {e}")));
                return;
            }
        };

        match &request.service.config.target_prefix {
            Some(prefix) => {
                let target = format!("{prefix}.{}", request.operation.name);
                request.http_request.set_header("x-amz-target", target);
                request
                    .http_request
                    .set_header("content-type", JSON_RPC_CONTENT_TYPE);
            }
            None => request.http_request.set_header("content-type", JSON_CONTENT_TYPE),
        }

        if body.is_null() {
            request.set_buffer_body(b"{}".to_vec());
            return;
        }
        match serde_json::to_vec(&body) {
            Ok(bytes) => request.set_buffer_body(bytes),
            Err(e) => request.error = Some(Error::Build(format!("failed to encode body: {e}"))),
        }
    })
}

/// Unmarshal step: decodes the response body into Data.
#[must_use]
pub fn unmarshal_handler() -> NamedHandler {
    NamedHandler::new(UNMARSHAL_HANDLER, |request: &mut Request| {
        let Some(response) = &request.http_response else {
            return;
        };
        if response.body.iter().all(u8::is_ascii_whitespace) {
            return;
        }

        let decoded = serde_json::from_slice::<Value>(&response.body)
            .map_err(|e| Error::Unmarshal(format!("invalid JSON body: {e}")))
            .and_then(|value| {
                request
                    .data
                    .load_json(value)
                    .map_err(|e| Error::Unmarshal(e.to_string()))
            });
        if let Err(error) = decoded {
            tracing::warn!(operation = %request.operation.name, error = %error, "Failed to decode response");
            request.error = Some(error);
        }
    })
}

/// UnmarshalError step: replaces the placeholder code and message of a
/// response error with the ones in the body.
///
/// Bodies that are not JSON objects keep the placeholder.
#[must_use]
pub fn unmarshal_error_handler() -> NamedHandler {
    NamedHandler::new(UNMARSHAL_ERROR_HANDLER, |request: &mut Request| {
        let Some(Error::Response { status, code, message, .. }) = &request.error else {
            return;
        };
        let (status, mut code, mut message) = (*status, code.clone(), message.clone());

        if let Some(body) = request
            .http_response
            .as_ref()
            .and_then(|response| serde_json::from_slice::<Value>(&response.body).ok())
        {
            if let Some(decoded) = error_code(&body) {
                code = decoded;
            }
            if let Some(decoded) = error_message(&body) {
                message = decoded;
            }
        }

        request.error = Some(Error::Response {
            status,
            code,
            message,
            request_id: request.request_id.clone(),
        });
    })
}

/// `__type` may be namespaced: `com.amazon.coral#ThrottlingException`.
fn error_code(body: &Value) -> Option<String> {
    ["__type", "code", "Code"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(|code| code.rsplit('#').next().unwrap_or(code).to_string())
}

fn error_message(body: &Value) -> Option<String> {
    ["message", "Message", "errorMessage"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Drop `null` object members recursively; unset optional params are omitted
/// from the wire.
fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(key, value)| (key, strip_nulls(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqchain_core::{Config, HttpResponse, Operation, Service};
    use serde_json::json;
    use std::sync::Arc;

    fn request(config: Config, params: Value) -> Request {
        let service = Service::new(config).unwrap();
        Arc::new(service).new_request(Arc::new(Operation::new("ListTables")), params, Value::Null)
    }

    fn plain_config() -> Config {
        Config::builder().endpoint("https://example.com").build()
    }

    #[test]
    fn test_build_serializes_params_without_nulls() {
        let mut request = request(plain_config(), json!({"Limit": 10, "Start": null, "Tags": [{"Key": "a", "Value": null}]}));
        (build_handler().func)(&mut request);

        assert!(request.error.is_none());
        let body: Value = serde_json::from_slice(&request.http_request.body).unwrap();
        assert_eq!(body, json!({"Limit": 10, "Tags": [{"Key": "a"}]}));
        assert_eq!(request.http_request.header("content-type"), Some("application/json"));
        assert!(request.http_request.header("x-amz-target").is_none());
    }

    #[test]
    fn test_build_sets_target_header() {
        let config = Config::builder()
            .endpoint("https://example.com")
            .target_prefix("DynamoDB_20120810")
            .build();
        let mut request = request(config, Value::Null);
        (build_handler().func)(&mut request);

        assert_eq!(
            request.http_request.header("X-Amz-Target"),
            Some("DynamoDB_20120810.ListTables")
        );
        assert_eq!(
            request.http_request.header("content-type"),
            Some("application/x-amz-json-1.1")
        );
        assert_eq!(request.http_request.body, b"{}");
    }

    #[test]
    fn test_unmarshal_loads_data() {
        let mut request = request(plain_config(), Value::Null);
        request.http_response = Some(HttpResponse::new(200, r#"{"TableNames":["a"]}"#));
        (unmarshal_handler().func)(&mut request);

        assert!(request.error.is_none());
        assert_eq!(request.data_as::<Value>(), Some(&json!({"TableNames": ["a"]})));
    }

    #[test]
    fn test_unmarshal_empty_body_leaves_data_zero() {
        let mut request = request(plain_config(), Value::Null);
        request.http_response = Some(HttpResponse::new(200, " \n"));
        (unmarshal_handler().func)(&mut request);

        assert!(request.error.is_none());
        assert_eq!(request.data_as::<Value>(), Some(&Value::Null));
    }

    #[test]
    fn test_unmarshal_invalid_json() {
        let mut request = request(plain_config(), Value::Null);
        request.http_response = Some(HttpResponse::new(200, "<html>"));
        (unmarshal_handler().func)(&mut request);
        assert!(matches!(request.error, Some(Error::Unmarshal(_))));
    }

    #[test]
    fn test_unmarshal_error_decodes_body() {
        let mut request = request(plain_config(), Value::Null);
        request.http_response = Some(HttpResponse::new(
            400,
            r#"{"__type":"com.amazonaws.dynamodb.v20120810#ResourceNotFoundException","message":"Table not found"}"#,
        ));
        request.request_id = Some("req-9".into());
        request.error = Some(Error::from_status(400));

        (unmarshal_error_handler().func)(&mut request);

        assert_eq!(
            request.error,
            Some(Error::Response {
                status: 400,
                code: "ResourceNotFoundException".into(),
                message: "Table not found".into(),
                request_id: Some("req-9".into()),
            })
        );
    }

    #[test]
    fn test_unmarshal_error_keeps_placeholder_for_non_json() {
        let mut request = request(plain_config(), Value::Null);
        request.http_response = Some(HttpResponse::new(502, "Bad Gateway"));
        request.error = Some(Error::from_status(502));

        (unmarshal_error_handler().func)(&mut request);

        assert_eq!(request.error.as_ref().and_then(Error::code), Some("HTTP 502"));
    }

    #[test]
    fn test_unmarshal_error_ignores_other_errors() {
        let mut request = request(plain_config(), Value::Null);
        request.error = Some(Error::Transport("reset".into()));
        (unmarshal_error_handler().func)(&mut request);
        assert_eq!(request.error, Some(Error::Transport("reset".into())));
    }
}
