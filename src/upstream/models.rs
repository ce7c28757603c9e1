// Record shapes returned by the openSenseMap management endpoints.
//
// Only the fields the admin pages use are typed; everything else the API
// sends is kept in `extra` so nothing is silently lost on display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub boxes: Vec<DeviceRef>,
    #[serde(rename = "emailIsConfirmed", default)]
    pub email_is_confirmed: bool,
    #[serde(rename = "lastUpdatedBy", default)]
    pub last_updated_by: Option<String>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A user's device as listed on the user: either just the id or the
/// populated device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeviceRef {
    Id(String),
    Device(Box<Device>),
}

impl DeviceRef {
    pub fn id(&self) -> &str {
        match self {
            DeviceRef::Id(id) => id,
            DeviceRef::Device(device) => &device.id,
        }
    }

    pub fn device(&self) -> Option<&Device> {
        match self {
            DeviceRef::Id(_) => None,
            DeviceRef::Device(device) => Some(device),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub exposure: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub grouptag: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner: Option<OwnerRef>,
    #[serde(rename = "currentLocation", default)]
    pub current_location: Option<Location>,
    #[serde(default)]
    pub loc: Vec<Value>,
    #[serde(default)]
    pub sensors: Vec<Value>,
    #[serde(default)]
    pub integrations: Option<Value>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(rename = "useAuth", default)]
    pub use_auth: Option<bool>,
    #[serde(rename = "lastMeasurementAt", default)]
    pub last_measurement_at: Option<DateTime<Utc>>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Device {
    pub fn owner_id(&self) -> Option<&str> {
        self.owner.as_ref().map(OwnerRef::id)
    }

    /// `(longitude, latitude)` from `currentLocation`, falling back to the
    /// first GeoJSON feature in `loc`.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        if let Some(location) = &self.current_location {
            if let [lng, lat, ..] = location.coordinates.as_slice() {
                return Some((*lng, *lat));
            }
        }

        let coordinates = self
            .loc
            .first()?
            .pointer("/geometry/coordinates")?
            .as_array()?;
        match coordinates.as_slice() {
            [lng, lat, ..] => Some((lng.as_f64()?, lat.as_f64()?)),
            _ => None,
        }
    }

    pub fn grouptag_text(&self) -> String {
        self.grouptag.join(",")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OwnerRef {
    Id(String),
    User(OwnerSummary),
}

impl OwnerRef {
    pub fn id(&self) -> &str {
        match self {
            OwnerRef::Id(id) => id,
            OwnerRef::User(owner) => &owner.id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerSummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// GeoJSON point; coordinates are `[lng, lat]` with an optional height.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub coordinates: Vec<f64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Older boxes carry `grouptag` as a single string.
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tags {
        One(String),
        Many(Vec<String>),
        Nothing(()),
    }

    Ok(match Tags::deserialize(deserializer)? {
        Tags::One(tag) if tag.is_empty() => Vec::new(),
        Tags::One(tag) => vec![tag],
        Tags::Many(tags) => tags,
        Tags::Nothing(()) => Vec::new(),
    })
}
