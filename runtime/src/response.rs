//! Response checks that apply to every protocol.

use reqchain_core::{Error, NamedHandler, Request};

/// Name of the ValidateResponse step installed by [`validate_response_handler`]
pub const VALIDATE_RESPONSE_HANDLER: &str = "reqchain.ValidateResponse";

/// Name of the UnmarshalMeta step installed by [`request_id_handler`]
pub const REQUEST_ID_HANDLER: &str = "reqchain.RequestId";

/// Response headers that carry a request identifier, in lookup order
pub const REQUEST_ID_HEADERS: [&str; 3] = ["x-amzn-requestid", "x-amz-request-id", "x-request-id"];

/// ValidateResponse step: a non-2xx status becomes [`Error::Response`].
///
/// The error carries a placeholder code `HTTP <status>`; the UnmarshalError
/// phase may replace it with the code decoded from the body.
#[must_use]
pub fn validate_response_handler() -> NamedHandler {
    NamedHandler::new(VALIDATE_RESPONSE_HANDLER, |request: &mut Request| {
        let Some(response) = &request.http_response else {
            request.error = Some(Error::Transport("no response received".to_string()));
            return;
        };
        if response.is_success() {
            return;
        }

        let status = response.status;
        tracing::debug!(operation = %request.operation.name, status, "Response rejected");
        request.error = Some(Error::Response {
            status,
            code: format!("HTTP {status}"),
            message: String::new(),
            request_id: request.request_id.clone(),
        });
    })
}

/// UnmarshalMeta step: records the service's request identifier.
#[must_use]
pub fn request_id_handler() -> NamedHandler {
    NamedHandler::new(REQUEST_ID_HANDLER, |request: &mut Request| {
        let Some(response) = &request.http_response else {
            return;
        };
        if let Some(id) = REQUEST_ID_HEADERS
            .iter()
            .find_map(|name| response.header(name))
        {
            request.request_id = Some(id.to_string());
        }
    })
}
