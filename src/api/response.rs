//! JSON response rendering
//!
//! Bodies end with a newline; pretty output is indented by two spaces.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

const APPLICATION_JSON: &str = "application/json";

/// Render `body` as a JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T, pretty: bool) -> Response {
    let rendered = if pretty {
        serde_json::to_string_pretty(body)
    } else {
        serde_json::to_string(body)
    };

    match rendered {
        Ok(mut text) => {
            text.push('\n');
            (
                status,
                [(header::CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON))],
                text,
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response body");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON))],
                "{\"message\": \"Failed to serialize response\"}\n",
            )
                .into_response()
        }
    }
}
