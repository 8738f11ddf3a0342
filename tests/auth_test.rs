
use axum::http::{StatusCode, header};
use serde_json::json;
use test_utils::{TEST_PASSWORD, TEST_USERNAME, body_json, login, send, spawn_app};

#[tokio::test]
async fn login_issues_a_hardened_cookie() {
    let app = spawn_app();

    let response = send(
        &app.router,
        "POST",
        "/admin/login",
        Some(json!({ "username": TEST_USERNAME, "password": TEST_PASSWORD })),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("admin_session="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Path=/"));
    assert!(set_cookie.contains("Max-Age=604800"), "got: {}", set_cookie);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn wrong_credentials_get_a_generic_401() {
    let app = spawn_app();

    for body in [
        json!({ "username": TEST_USERNAME, "password": "wrong" }),
        json!({ "username": "intruder", "password": TEST_PASSWORD }),
    ] {
        let response = send(&app.router, "POST", "/admin/login", Some(body), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        // Same message for bad username and bad password: no enumeration
        assert_eq!(body["error"], "Invalid username or password");
    }
}

#[tokio::test]
async fn session_probe_reflects_authentication() {
    let app = spawn_app();

    let response = send(&app.router, "GET", "/admin/login", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let cookie = login(&app.router).await;
    let response = send(&app.router, "GET", "/admin/login", None, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["username"], TEST_USERNAME);
}

#[tokio::test]
async fn logout_clears_the_cookie_and_is_idempotent() {
    let app = spawn_app();
    let cookie = login(&app.router).await;

    let response = send(&app.router, "DELETE", "/admin/login", None, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with("admin_session="));
    assert!(set_cookie.contains("Max-Age=0"), "got: {}", set_cookie);

    // Logout without any session still succeeds
    let response = send(&app.router, "DELETE", "/admin/login", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn tampered_session_cookie_is_rejected() {
    let app = spawn_app();
    let cookie = login(&app.router).await;

    // Flipping the token invalidates the MAC: presence alone proves nothing
    let forged = format!("{}x", cookie);
    let response = send(&app.router, "GET", "/admin/messages", None, Some(&forged)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The untampered cookie still works
    let response = send(&app.router, "GET", "/admin/messages", None, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
}
