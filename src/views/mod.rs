//! Server-rendered HTML pages.
//!
//! Every interpolated value goes through [`escape`]; markup is kept plain so
//! the pages work without scripts.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;

use crate::auth::FieldErrors;
use crate::upstream::{Device, User};

/// Escape text for use in element content and quoted attributes.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn date(value: Option<&DateTime<Utc>>) -> String {
    value
        .map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_default()
}

/// Result of a form submission shown above the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Failure(String),
}

impl Notice {
    fn render(&self) -> String {
        match self {
            Notice::Success(msg) => format!(r#"<p class="notice" role="status">{}</p>"#, escape(msg)),
            Notice::Failure(msg) => format!(r#"<p class="notice error" role="alert">{}</p>"#, escape(msg)),
        }
    }
}

fn layout(title: &str, signed_in: bool, body: &str) -> String {
    let nav = if signed_in {
        r#"<nav>
  <a href="/">Home</a>
  <a href="/users">Users</a>
  <a href="/devices">Boxes</a>
  <form action="/logout" method="post" class="inline"><button type="submit">Logout</button></form>
</nav>"#
    } else {
        ""
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>{title} | openSenseMap Admin</title>
</head>
<body>
{nav}
<main>
{body}
</main>
</body>
</html>
"#,
        title = escape(title),
        nav = nav,
        body = body
    )
}

/// State of the login form after a failed submission.
#[derive(Debug, Clone, Default)]
pub struct LoginPage {
    pub redirect_to: Option<String>,
    pub username: Option<String>,
    pub field_errors: FieldErrors,
    pub form_error: Option<String>,
}

pub fn login_page(page: &LoginPage) -> String {
    let field = |name: &str, label: &str, kind: &str, value: Option<&str>| {
        let error = page.field_errors.get(name);
        let mut html = format!(
            r#"<div>
  <label for="{name}-input">{label}</label>
  <input type="{kind}" id="{name}-input" name="{name}" value="{value}"{invalid}>
"#,
            name = name,
            label = label,
            kind = kind,
            value = escape(value.unwrap_or_default()),
            invalid = if error.is_some() {
                format!(r#" aria-invalid="true" aria-errormessage="{}-error""#, name)
            } else {
                String::new()
            }
        );
        if let Some(error) = error {
            let _ = writeln!(html, r#"  <p role="alert" id="{}-error">{}</p>"#, name, escape(error));
        }
        html.push_str("</div>\n");
        html
    };

    let form_error = page
        .form_error
        .as_deref()
        .map(|e| format!(r#"<p role="alert">{}</p>"#, escape(e)))
        .unwrap_or_default();

    let body = format!(
        r#"<h1>Login</h1>
<form method="post" action="/login">
<input type="hidden" name="redirectTo" value="{redirect}">
<fieldset>
  <legend>Login</legend>
  <label><input type="radio" name="loginType" value="login" checked> Login</label>
</fieldset>
{username}{password}<div id="form-error-message">{form_error}</div>
<button type="submit">Submit</button>
</form>"#,
        redirect = escape(page.redirect_to.as_deref().unwrap_or_default()),
        username = field("username", "Username", "text", page.username.as_deref()),
        password = field("password", "Password", "password", None),
        form_error = form_error
    );

    layout("Login", false, &body)
}

pub fn index_page() -> String {
    layout(
        "Home",
        true,
        r#"<h1>openSenseMap Admin Tool</h1>
<ul>
  <li><a href="/users">Edit users</a></li>
  <li><a href="/devices">Edit devices</a></li>
</ul>"#,
    )
}

pub fn users_page(users: &[User]) -> String {
    let mut rows = String::new();
    for user in users {
        let _ = write!(
            rows,
            r#"<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td><a href="/users/{}">Open</a></td></tr>
"#,
            escape(&user.name),
            escape(&user.email),
            if user.email_is_confirmed { "yes" } else { "no" },
            date(user.created_at.as_ref()),
            date(user.updated_at.as_ref()),
            user.boxes.len(),
            escape(&user.id)
        );
    }

    let body = format!(
        r#"<h1>Users</h1>
<p>Total users: {count}</p>
<table>
<thead><tr><th>Name</th><th>E-Mail</th><th>Confirmed</th><th>Created at</th><th>Updated at</th><th># Devices</th><th></th></tr></thead>
<tbody>
{rows}</tbody>
</table>"#,
        count = users.len(),
        rows = rows
    );
    layout("Users", true, &body)
}

pub fn user_page(user: &User, notice: Option<&Notice>) -> String {
    let role_option = |value: &str, label: &str| {
        format!(
            r#"<option value="{value}"{selected}>{label}</option>"#,
            value = value,
            label = label,
            selected = if user.role == value { " selected" } else { "" }
        )
    };

    let mut devices = String::new();
    for device_ref in &user.boxes {
        let id = escape(device_ref.id());
        match device_ref.device() {
            Some(device) => {
                let _ = writeln!(
                    devices,
                    r#"<tr><td>{}</td><td>{}</td><td>{}</td><td><a href="/devices/{}">Open</a></td></tr>"#,
                    escape(&device.name),
                    escape(device.exposure.as_deref().unwrap_or_default()),
                    escape(device.model.as_deref().unwrap_or_default()),
                    id
                );
            }
            None => {
                let _ = writeln!(
                    devices,
                    r#"<tr><td colspan="3">{id}</td><td><a href="/devices/{id}">Open</a></td></tr>"#,
                    id = id
                );
            }
        }
    }

    let body = format!(
        r#"<h1>{name}</h1>
{notice}
<h2>Personal Information</h2>
<form method="post">
<fieldset>
  <label for="name">Name</label>
  <input type="text" name="name" id="name" value="{name}">
  <label for="email">E-Mail</label>
  <input type="email" name="email" id="email" value="{email}">
  <label><input type="checkbox" name="email-confirmed" id="email-confirmed"{confirmed}> E-Mail confirmed</label>
  <label for="language">Language</label>
  <input type="text" name="language" id="language" value="{language}">
  <label for="role">Role</label>
  <select name="role" id="role">{admin}{user_role}</select>
  <label for="user-id">User ID</label>
  <input type="text" id="user-id" value="{id}" disabled>
  <label for="created-at">Created at</label>
  <input type="text" id="created-at" value="{created}" disabled>
  <label for="updated-at">Updated at</label>
  <input type="text" id="updated-at" value="{updated}" disabled>
</fieldset>
<div class="actions">
  <button type="submit" name="_action" value="passwordReset">Reset password</button>
  <button type="submit" name="_action" value="resendWelcomeMail">Resend Welcome Mail</button>
  <button type="submit" name="_action" value="resendEmailConfirmation">Resend Email Confirmation</button>
  <button type="submit" name="_action" value="delete">Delete user</button>
  <button type="submit" name="_action" value="update">Update user</button>
</div>
</form>
<h2>Devices</h2>
<table>
<thead><tr><th>Name</th><th>Exposure</th><th>Model</th><th></th></tr></thead>
<tbody>
{devices}</tbody>
</table>"#,
        name = escape(&user.name),
        notice = notice.map(Notice::render).unwrap_or_default(),
        email = escape(&user.email),
        confirmed = if user.email_is_confirmed { " checked" } else { "" },
        language = escape(&user.language),
        admin = role_option("admin", "Admin"),
        user_role = role_option("user", "User"),
        id = escape(&user.id),
        created = date(user.created_at.as_ref()),
        updated = date(user.updated_at.as_ref()),
        devices = devices
    );
    layout(&user.name, true, &body)
}

pub fn devices_page(devices: &[Device]) -> String {
    let mut rows = String::new();
    for device in devices {
        let _ = writeln!(
            rows,
            r#"<tr><td>{id}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td><a href="/devices/{id}">Open</a></td></tr>"#,
            escape(&device.name),
            escape(device.exposure.as_deref().unwrap_or_default()),
            escape(device.model.as_deref().unwrap_or_default()),
            date(device.updated_at.as_ref()),
            id = escape(&device.id)
        );
    }

    let body = format!(
        r#"<h1>Devices</h1>
<p>Total devices: {count}</p>
<table>
<thead><tr><th>ID</th><th>Name</th><th>Exposure</th><th>Model</th><th>Updated at</th><th></th></tr></thead>
<tbody>
{rows}</tbody>
</table>"#,
        count = devices.len(),
        rows = rows
    );
    layout("Devices", true, &body)
}

pub fn device_page(device: &Device, users: &[User], maptiler_key: &str, notice: Option<&Notice>) -> String {
    let owner_id = device.owner_id().unwrap_or_default();

    let mut owners = String::from(r#"<option value="">no owner defined</option>"#);
    for user in users {
        let _ = write!(
            owners,
            r#"<option value="{id}"{selected}>{name} ({email})</option>"#,
            id = escape(&user.id),
            selected = if user.id == owner_id { " selected" } else { "" },
            name = escape(&user.name),
            email = escape(&user.email)
        );
    }

    let exposure = device.exposure.as_deref().unwrap_or_default();
    let exposures: String = ["indoor", "outdoor", "mobile"]
        .iter()
        .map(|value| {
            format!(
                r#"<label><input type="radio" name="exposure" value="{value}"{checked}> {value}</label>"#,
                value = value,
                checked = if exposure == *value { " checked" } else { "" }
            )
        })
        .collect();

    let (lng, lat) = device
        .coordinates()
        .map(|(lng, lat)| (lng.to_string(), lat.to_string()))
        .unwrap_or_default();

    let body = format!(
        r#"<h1>{name}</h1>
{notice}
<h2>Device details</h2>
<form method="post">
<fieldset>
  <label for="name">Name</label>
  <input type="text" name="name" id="name" value="{name}">
  <label for="owner">Owner</label>
  <select name="owner" id="owner">{owners}</select>
  <input type="hidden" name="currentOwner" value="{owner_id}">
  <label for="grouptag">Grouptags</label>
  <input type="text" name="grouptag" id="grouptag" value="{grouptag}">
  <label for="description">Description</label>
  <input type="text" name="description" id="description" value="{description}">
  <label for="access_token">Access token</label>
  <input type="text" name="access_token" id="access_token" value="{access_token}">
  <div>{exposures}</div>
  <label for="longitude">Longitude</label>
  <input type="text" name="longitude" id="longitude" value="{lng}">
  <label for="latitude">Latitude</label>
  <input type="text" name="latitude" id="latitude" value="{lat}">
  <label for="model">Model</label>
  <input type="text" name="model" id="model" value="{model}" readonly>
  <label for="device-id">Device ID</label>
  <input type="text" id="device-id" value="{id}" disabled>
  <label for="created-at">Created at</label>
  <input type="text" id="created-at" value="{created}" disabled>
  <label for="updated-at">Updated at</label>
  <input type="text" id="updated-at" value="{updated}" disabled>
</fieldset>
<div class="actions">
  <button type="submit" name="_action" value="delete">Delete device</button>
  <button type="submit" name="_action" value="update">Update device</button>
</div>
</form>
<div id="map" data-maptiler-key="{maptiler_key}" data-lng="{lng}" data-lat="{lat}"></div>
<h2>Sensors</h2>
<p>{sensor_count} sensors, last measurement {last_measurement}</p>"#,
        name = escape(&device.name),
        notice = notice.map(Notice::render).unwrap_or_default(),
        owners = owners,
        owner_id = escape(owner_id),
        grouptag = escape(&device.grouptag_text()),
        description = escape(device.description.as_deref().unwrap_or_default()),
        access_token = escape(device.access_token.as_deref().unwrap_or_default()),
        exposures = exposures,
        lng = lng,
        lat = lat,
        model = escape(device.model.as_deref().unwrap_or_default()),
        id = escape(&device.id),
        created = date(device.created_at.as_ref()),
        updated = date(device.updated_at.as_ref()),
        maptiler_key = escape(maptiler_key),
        sensor_count = device.sensors.len(),
        last_measurement = date(device.last_measurement_at.as_ref())
    );
    layout(&device.name, true, &body)
}

pub fn error_page(status: StatusCode, code: &str, message: &str) -> String {
    let body = format!(
        r#"<h1>{status}</h1>
<p>{message}</p>
<p><code>{code}</code></p>
<p><a href="/">Back to start</a></p>"#,
        status = status,
        message = escape(message),
        code = escape(code)
    );
    layout("Error", false, &body)
}
