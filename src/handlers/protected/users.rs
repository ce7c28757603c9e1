// handlers/protected/users.rs - /users and /users/:id

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
use crate::upstream::{FormFields, UserAction, UserUpdate};
use crate::views::{self, Notice};

/// GET /users - every account known to the API.
pub async fn users_index(
    State(state): State<AppState>,
    RequireToken(token): RequireToken,
) -> Result<Html<String>, AppError> {
    let users = state.upstream.users(&token).list().await?;
    Ok(Html(views::users_page(&users)))
}

/// GET /users/:id - edit form plus the user's devices.
pub async fn user_show(
    State(state): State<AppState>,
    RequireToken(token): RequireToken,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let user = state.upstream.users(&token).get(&id).await?;
    Ok(Html(views::user_page(&user, None)))
}

/// POST /users/:id - dispatch on the `_action` button.
///
/// | `_action` | effect |
/// |---|---|
/// | `update` | PUT the changed fields |
/// | `delete` | batch delete with this one id, back to the list |
/// | `passwordReset`, `resendWelcomeMail`, `resendEmailConfirmation` | forwarded to the exec endpoint |
pub async fn user_action(
    State(state): State<AppState>,
    RequireToken(token): RequireToken,
    Path(id): Path<String>,
    Form(form): Form<FormFields>,
) -> Result<Response, AppError> {
    let action: UserAction = parse_action(&form)?;
    let users = state.upstream.users(&token);

    let notice = match action {
        UserAction::Delete => {
            users.delete(std::slice::from_ref(&id)).await?;
            tracing::info!("Deleted user {}", id);
            return Ok(Redirect::to("/users").into_response());
        }
        UserAction::Update => {
            let changes = UserUpdate::from_form(&form).into_json();
            match users.update(&id, &changes).await {
                Ok(answer) if accepted(&answer) => Notice::Success("User updated".to_string()),
                Ok(answer) => {
                    tracing::warn!("Update of user {} not accepted: {}", id, answer);
                    Notice::Failure("Sorry :( the user could not be updated".to_string())
                }
                Err(e) => {
                    tracing::warn!("Update of user {} failed: {}", id, e);
                    Notice::Failure("Sorry :( the user could not be updated".to_string())
                }
            }
        }
        exec => {
            let name = exec.exec_name().unwrap_or_default();
            match users.exec_action(&id, name).await {
                Ok(answer) if accepted(&answer) => Notice::Success(format!("Action {} triggered", name)),
                Ok(answer) => {
                    tracing::warn!("Action {} on user {} not accepted: {}", name, id, answer);
                    Notice::Failure(format!("Sorry :( action {} failed", name))
                }
                Err(e) => {
                    tracing::warn!("Action {} on user {} failed: {}", name, id, e);
                    Notice::Failure(format!("Sorry :( action {} failed", name))
                }
            }
        }
    };

    let status = match notice {
        Notice::Success(_) => StatusCode::OK,
        Notice::Failure(_) => StatusCode::BAD_GATEWAY,
    };
    let user = users.get(&id).await?;
    Ok((status, Html(views::user_page(&user, Some(&notice)))).into_response())
}
