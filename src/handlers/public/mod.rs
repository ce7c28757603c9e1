// handlers/public/mod.rs - Public handlers (no session required)
//
// Security Level: None
// Only the login page lives here; everything else requires a session.

pub mod login;

pub use login::{login_get, login_post};
