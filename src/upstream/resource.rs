use std::marker::PhantomData;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use super::models::{Device, User};
use super::{UpstreamClient, UpstreamError};

/// A collection under `/management` on the upstream API.
pub trait Resource {
    /// Path segment below `/management`.
    const PATH: &'static str;
    /// Key holding the records in the list response.
    const LIST_KEY: &'static str;
    /// Key holding the id list in a batch delete request.
    const DELETE_KEY: &'static str;

    type Record: DeserializeOwned;
}

#[derive(Debug, Clone, Copy)]
pub struct Users;

impl Resource for Users {
    const PATH: &'static str = "users";
    const LIST_KEY: &'static str = "users";
    const DELETE_KEY: &'static str = "userIds";
    type Record = User;
}

/// Devices are called "boxes" upstream.
#[derive(Debug, Clone, Copy)]
pub struct Devices;

impl Resource for Devices {
    const PATH: &'static str = "boxes";
    const LIST_KEY: &'static str = "boxes";
    const DELETE_KEY: &'static str = "boxIds";
    type Record = Device;
}

/// Pass-through CRUD for one resource, authorized with the operator's token.
pub struct ResourceProxy<'a, R> {
    client: &'a UpstreamClient,
    token: &'a str,
    _resource: PhantomData<R>,
}

impl<'a, R: Resource> ResourceProxy<'a, R> {
    pub fn new(client: &'a UpstreamClient, token: &'a str) -> Self {
        Self {
            client,
            token,
            _resource: PhantomData,
        }
    }

    /// GET /management/<resource>
    pub async fn list(&self) -> Result<Vec<R::Record>, UpstreamError> {
        let mut body: Value = self
            .client
            .send(Method::GET, &["management", R::PATH], Some(self.token), None)
            .await?;

        let records = body
            .get_mut(R::LIST_KEY)
            .map(Value::take)
            .ok_or_else(|| {
                UpstreamError::UnexpectedShape(format!("list response has no `{}` field", R::LIST_KEY))
            })?;

        serde_json::from_value(records).map_err(|e| UpstreamError::UnexpectedShape(e.to_string()))
    }

    /// GET /management/<resource>/<id>
    pub async fn get(&self, id: &str) -> Result<R::Record, UpstreamError> {
        self.client
            .send(Method::GET, &["management", R::PATH, id], Some(self.token), None)
            .await
    }

    /// PUT /management/<resource>/<id> with the changed fields.
    pub async fn update(&self, id: &str, changes: &Value) -> Result<Value, UpstreamError> {
        self.client
            .send(Method::PUT, &["management", R::PATH, id], Some(self.token), Some(changes))
            .await
    }

    /// POST /management/<resource>/delete for a batch of ids.
    pub async fn delete(&self, ids: &[String]) -> Result<Value, UpstreamError> {
        let mut fields = Map::new();
        fields.insert(R::DELETE_KEY.to_string(), json!(ids));
        let body = Value::Object(fields);
        self.client
            .send(Method::POST, &["management", R::PATH, "delete"], Some(self.token), Some(&body))
            .await
    }

    /// POST /management/<resource>/<id>/exec to trigger a named server-side action.
    pub async fn exec_action(&self, id: &str, action: &str) -> Result<Value, UpstreamError> {
        let body = json!({ "action": action });
        self.client
            .send(Method::POST, &["management", R::PATH, id, "exec"], Some(self.token), Some(&body))
            .await
    }
}
