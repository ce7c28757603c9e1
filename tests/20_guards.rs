mod common;

use anyhow::Result;
use reqwest::StatusCode;

#[tokio::test]
async fn protected_pages_redirect_to_login() -> Result<()> {
    let app = common::spawn_app().await?;

    for (path, target) in [
        ("/", "/login?redirectTo=%2F"),
        ("/users", "/login?redirectTo=%2Fusers"),
        ("/devices/b1", "/login?redirectTo=%2Fdevices%2Fb1"),
    ] {
        let res = app.client.get(app.url(path)).send().await?;
        assert_eq!(res.status(), StatusCode::SEE_OTHER, "{}", path);
        assert_eq!(common::location(&res).as_deref(), Some(target), "{}", path);
    }
    Ok(())
}

#[tokio::test]
async fn forged_cookie_is_ignored() -> Result<()> {
    let app = common::spawn_app().await?;

    let res = app
        .client
        .get(app.url("/devices"))
        .header(reqwest::header::COOKIE, "osem-admin-jwt=not.a.session")
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    Ok(())
}

#[tokio::test]
async fn session_grants_access_to_index() -> Result<()> {
    let app = common::spawn_app().await?;
    let cookie = app.login_as(common::ADMIN_LOGIN).await?;

    let res = app
        .client
        .get(app.url("/"))
        .header(reqwest::header::COOKIE, cookie)
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.text().await?.contains("openSenseMap Admin Tool"));
    Ok(())
}

#[tokio::test]
async fn logout_clears_cookie() -> Result<()> {
    let app = common::spawn_app().await?;
    let cookie = app.login_as(common::ADMIN_LOGIN).await?;

    let res = app
        .client
        .post(app.url("/logout"))
        .header(reqwest::header::COOKIE, cookie)
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(common::location(&res).as_deref(), Some("/"));

    let set_cookie = res
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(set_cookie.starts_with("osem-admin-jwt=;"));
    assert!(set_cookie.contains("Max-Age=0"));
    Ok(())
}

#[tokio::test]
async fn expired_bearer_token_redirects_to_login() -> Result<()> {
    let app = common::spawn_app().await?;
    let expired = common::issue_token_expiring("admin", chrono::Utc::now().timestamp() - 3600);
    let cookie = common::session_cookie_for(&expired)?;

    let res = app
        .client
        .get(app.url("/users"))
        .header(reqwest::header::COOKIE, &cookie)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        common::location(&res).as_deref(),
        Some("/login?redirectTo=%2Fusers")
    );

    // The login page must not bounce an expired session back to /devices
    let res = app
        .client
        .get(app.url("/login"))
        .header(reqwest::header::COOKIE, &cookie)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}
