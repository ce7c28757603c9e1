pub mod guard;

pub use guard::{get_token, login_redirect, require_token, MaybeToken, RequireToken};
