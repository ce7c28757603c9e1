// handlers/protected/devices.rs - /devices and /devices/:id

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};

use super::{accepted, parse_action};
use crate::error::AppError;
use crate::middleware::RequireToken;
use crate::state::AppState;
use crate::upstream::{DeviceAction, DeviceUpdate, FormFields};
use crate::views::{self, Notice};

/// GET /devices
pub async fn devices_index(
    State(state): State<AppState>,
    RequireToken(token): RequireToken,
) -> Result<Html<String>, AppError> {
    let devices = state.upstream.devices(&token).list().await?;
    Ok(Html(views::devices_page(&devices)))
}

/// GET /devices/:id - edit form; loads all users for the owner select.
pub async fn device_show(
    State(state): State<AppState>,
    RequireToken(token): RequireToken,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    render_device(&state, &token, &id, None).await
}

/// POST /devices/:id - `_action` is `update` or `delete`.
pub async fn device_action(
    State(state): State<AppState>,
    RequireToken(token): RequireToken,
    Path(id): Path<String>,
    Form(form): Form<FormFields>,
) -> Result<Response, AppError> {
    let action: DeviceAction = parse_action(&form)?;
    let devices = state.upstream.devices(&token);

    match action {
        DeviceAction::Delete => {
            devices.delete(std::slice::from_ref(&id)).await?;
            tracing::info!("Deleted device {}", id);
            Ok(Redirect::to("/devices").into_response())
        }
        DeviceAction::Update => {
            let update = match DeviceUpdate::from_form(&form) {
                Ok(update) => update,
                Err(e) => {
                    let notice = Notice::Failure(e.to_string());
                    let page = render_device(&state, &token, &id, Some(&notice)).await?;
                    return Ok((StatusCode::BAD_REQUEST, page).into_response());
                }
            };

            if update.changes_owner() {
                tracing::info!("Transferring device {} to a new owner", id);
            }

            let (status, notice) = match devices.update(&id, &update.into_json()).await {
                Ok(answer) if accepted(&answer) => {
                    (StatusCode::OK, Notice::Success("Device updated".to_string()))
                }
                Ok(answer) => {
                    tracing::warn!("Update of device {} not accepted: {}", id, answer);
                    (
                        StatusCode::BAD_GATEWAY,
                        Notice::Failure("Sorry :( the device could not be updated".to_string()),
                    )
                }
                Err(e) => {
                    tracing::warn!("Update of device {} failed: {}", id, e);
                    (
                        StatusCode::BAD_GATEWAY,
                        Notice::Failure("Sorry :( the device could not be updated".to_string()),
                    )
                }
            };

            let page = render_device(&state, &token, &id, Some(&notice)).await?;
            Ok((status, page).into_response())
        }
    }
}

async fn render_device(
    state: &AppState,
    token: &str,
    id: &str,
    notice: Option<&Notice>,
) -> Result<Html<String>, AppError> {
    let device = state.upstream.devices(token).get(id).await?;
    let users = state.upstream.users(token).list().await?;
    Ok(Html(views::device_page(
        &device,
        &users,
        &state.config.map.maptiler_key,
        notice,
    )))
}
