// handlers/protected/mod.rs - Protected handlers (session required)
//
// Security Level: valid session cookie, enforced by the `RequireToken`
// extractor; a missing session redirects to /login?redirectTo=<path>.
// Authorization of the actual changes happens upstream with the operator's
// bearer token.

use serde_json::Value;
use std::str::FromStr;

use crate::error::AppError;
use crate::upstream::{payload::ACTION_FIELD, FormFields, PayloadError};

pub mod devices;
pub mod session;
pub mod users;

pub use devices::{device_action, device_show, devices_index};
pub use session::{index, logout};
pub use users::{user_action, user_show, users_index};

/// The `_action` button of a posted form. Unknown values are rejected.
fn parse_action<A>(form: &FormFields) -> Result<A, AppError>
where
    A: FromStr<Err = PayloadError>,
{
    let raw = form.get(ACTION_FIELD).map(String::as_str).unwrap_or_default();
    raw.parse().map_err(|e: PayloadError| match e {
        PayloadError::UnknownAction(action) => AppError::unknown_action(action),
        other => AppError::bad_request(other.to_string()),
    })
}

/// Upstream mutation answers carry `"code": "Ok"` on success.
fn accepted(answer: &Value) -> bool {
    answer
        .get("code")
        .and_then(Value::as_str)
        .map_or(true, |code| code == "Ok")
}
