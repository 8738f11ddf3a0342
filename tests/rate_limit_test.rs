
use axum::http::{StatusCode, header};
use serde_json::json;
use test_utils::{TEST_PASSWORD, TEST_USERNAME, body_json, send, send_with_headers, spawn_app};

const BROWSER_UA: &str = "Mozilla/5.0 (test)";

async fn attempt_login(
    app: &test_utils::TestApp,
    password: &str,
    user_agent: &str,
) -> axum::http::Response<axum::body::Body> {
    send_with_headers(
        &app.router,
        "POST",
        "/admin/login",
        Some(json!({ "username": TEST_USERNAME, "password": password })),
        None,
        &[("user-agent", user_agent)],
    )
    .await
}

#[tokio::test]
async fn sixth_attempt_is_locked_out_even_with_correct_password() {
    let app = spawn_app();

    for i in 0..5 {
        let response = attempt_login(&app, "wrong-password", BROWSER_UA).await;
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "attempt {} should fail credentials, not rate limiting",
            i + 1
        );
    }

    // Even the correct password is rejected while the lockout is active
    let response = attempt_login(&app, TEST_PASSWORD, BROWSER_UA).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let retry_after: i64 = response
        .headers()
        .get(header::RETRY_AFTER)
        .expect("429 carries Retry-After")
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0);

    let body = body_json(response).await;
    assert!(body["retryAfterSeconds"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn successful_login_resets_the_counter() {
    let app = spawn_app();

    for _ in 0..4 {
        let response = attempt_login(&app, "wrong-password", BROWSER_UA).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // A success clears the entry...
    let response = attempt_login(&app, TEST_PASSWORD, BROWSER_UA).await;
    assert_eq!(response.status(), StatusCode::OK);

    // ...so five more failures are credential errors again, not lockouts
    for _ in 0..5 {
        let response = attempt_login(&app, "wrong-password", BROWSER_UA).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    let response = attempt_login(&app, "wrong-password", BROWSER_UA).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn client_identifiers_are_isolated() {
    let app = spawn_app();

    // Lock out one client identifier
    for _ in 0..6 {
        attempt_login(&app, "wrong-password", BROWSER_UA).await;
    }
    let response = attempt_login(&app, TEST_PASSWORD, BROWSER_UA).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // A different user agent maps to a different counter and still gets in
    let response = attempt_login(&app, TEST_PASSWORD, "curl/8.0").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn lockout_does_not_affect_public_intake() {
    let app = spawn_app();

    for _ in 0..6 {
        attempt_login(&app, "wrong-password", BROWSER_UA).await;
    }

    let response = send(
        &app.router,
        "POST",
        "/contact",
        Some(json!({ "name": "Yamada Taro", "email": "taro@example.com" })),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}
