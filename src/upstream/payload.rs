// Turning submitted edit forms into upstream update bodies.

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Submitted form, field name -> raw value.
pub type FormFields = BTreeMap<String, String>;

/// Form field carrying the button that submitted the form.
pub const ACTION_FIELD: &str = "_action";

/// Read-only inputs that are displayed on edit forms but never sent upstream.
const DISPLAY_ONLY: &[&str] = &["device-id", "user-id", "created-at", "updated-at"];

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PayloadError {
    #[error("{field} must be a number, got {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("{field} is out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("latitude and longitude must be given together")]
    IncompleteLocation,

    #[error("Unknown action: {0}")]
    UnknownAction(String),
}

/// Buttons on the user detail page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Update,
    Delete,
    PasswordReset,
    ResendWelcomeMail,
    ResendEmailConfirmation,
}

impl UserAction {
    /// Name of the upstream exec action, for actions that are forwarded as-is.
    pub fn exec_name(self) -> Option<&'static str> {
        match self {
            UserAction::PasswordReset => Some("passwordReset"),
            UserAction::ResendWelcomeMail => Some("resendWelcomeMail"),
            UserAction::ResendEmailConfirmation => Some("resendEmailConfirmation"),
            UserAction::Update | UserAction::Delete => None,
        }
    }
}

impl FromStr for UserAction {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "update" => Ok(UserAction::Update),
            "delete" => Ok(UserAction::Delete),
            "passwordReset" => Ok(UserAction::PasswordReset),
            "resendWelcomeMail" => Ok(UserAction::ResendWelcomeMail),
            "resendEmailConfirmation" => Ok(UserAction::ResendEmailConfirmation),
            other => Err(PayloadError::UnknownAction(other.to_string())),
        }
    }
}

/// Buttons on the device detail page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceAction {
    Update,
    Delete,
}

impl FromStr for DeviceAction {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "update" => Ok(DeviceAction::Update),
            "delete" => Ok(DeviceAction::Delete),
            other => Err(PayloadError::UnknownAction(other.to_string())),
        }
    }
}

/// Body for `PUT /management/boxes/:id`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceUpdate {
    fields: Map<String, Value>,
}

impl DeviceUpdate {
    /// Form field with the owner picked in the select box.
    pub const OWNER: &'static str = "owner";
    /// Hidden field with the owner the page was rendered with.
    pub const CURRENT_OWNER: &'static str = "currentOwner";
    /// Hidden field older pages used, empty unless the owner changed.
    pub const NEW_OWNER: &'static str = "newOwner";

    pub fn from_form(form: &FormFields) -> Result<Self, PayloadError> {
        let mut fields = Map::new();

        for (key, value) in form {
            let special = [
                ACTION_FIELD,
                Self::OWNER,
                Self::CURRENT_OWNER,
                Self::NEW_OWNER,
                "grouptag",
                "latitude",
                "longitude",
            ];
            if special.contains(&key.as_str()) || DISPLAY_ONLY.contains(&key.as_str()) {
                continue;
            }
            fields.insert(key.clone(), Value::String(value.clone()));
        }

        // The API always tries to transfer the box when `owner` is present
        // and fails if the new owner equals the current one.
        let current = non_empty(form.get(Self::CURRENT_OWNER));
        let wanted = non_empty(form.get(Self::OWNER)).or_else(|| non_empty(form.get(Self::NEW_OWNER)));
        if let Some(owner) = wanted {
            if Some(owner) != current {
                fields.insert("owner".to_string(), json!(owner));
            }
        }

        if let Some(tags) = form.get("grouptag") {
            fields.insert("grouptag".to_string(), json!(split_grouptag(tags)));
        }

        let latitude = non_empty(form.get("latitude"));
        let longitude = non_empty(form.get("longitude"));
        match (longitude, latitude) {
            (Some(lng), Some(lat)) => {
                let lng = parse_coordinate("longitude", lng, 180.0)?;
                let lat = parse_coordinate("latitude", lat, 90.0)?;
                fields.insert("location".to_string(), json!([lng, lat]));
            }
            (None, None) => {}
            _ => return Err(PayloadError::IncompleteLocation),
        }

        Ok(Self { fields })
    }

    pub fn changes_owner(&self) -> bool {
        self.fields.contains_key("owner")
    }

    pub fn into_json(self) -> Value {
        Value::Object(self.fields)
    }
}

/// Body for `PUT /management/users/:id`. Empty inputs are left out so they
/// don't overwrite upstream values.
#[derive(Debug, Clone, PartialEq)]
pub struct UserUpdate {
    fields: Map<String, Value>,
}

impl UserUpdate {
    pub const EMAIL_CONFIRMED: &'static str = "email-confirmed";

    pub fn from_form(form: &FormFields) -> Self {
        let mut fields = Map::new();

        for (key, value) in form {
            if key == ACTION_FIELD
                || key == Self::EMAIL_CONFIRMED
                || DISPLAY_ONLY.contains(&key.as_str())
                || value.trim().is_empty()
            {
                continue;
            }
            fields.insert(key.clone(), Value::String(value.trim().to_string()));
        }

        // Unchecked checkboxes are not submitted at all
        let confirmed = form
            .get(Self::EMAIL_CONFIRMED)
            .is_some_and(|v| v == "on" || v == "true");
        fields.insert("emailIsConfirmed".to_string(), Value::Bool(confirmed));

        Self { fields }
    }

    pub fn into_json(self) -> Value {
        Value::Object(self.fields)
    }
}

/// `"a,b"` -> `["a", "b"]`, `""` -> `[]`.
///
/// Tags are normalised: whitespace is trimmed and empty segments such as the
/// middle of `"a,,b"` are dropped rather than stored as `""`.
pub fn split_grouptag(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_coordinate(field: &'static str, raw: &str, limit: f64) -> Result<f64, PayloadError> {
    let value: f64 = raw.parse().map_err(|_| PayloadError::InvalidNumber {
        field,
        value: raw.to_string(),
    })?;
    if !value.is_finite() || value.abs() > limit {
        return Err(PayloadError::OutOfRange { field, value });
    }
    Ok(value)
}
