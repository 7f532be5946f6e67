mod support;

use axum::http::{Response, StatusCode, header};
use support::{COOKIE_NAME, PASSWORD, TestApp, body_text, location};

fn session_cookie(response: &Response<axum::body::Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&format!("{COOKIE_NAME}=")))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

#[tokio::test]
async fn signup_signs_the_user_in() {
    let app = TestApp::new();

    let response = app
        .post_form(
            "/auth/signup/",
            None,
            &[
                ("first_name", "Leo"),
                ("last_name", "Tolstoy"),
                ("username", "leo"),
                ("email", "leo@example.com"),
                ("password1", PASSWORD),
                ("password2", PASSWORD),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    let cookie = session_cookie(&response).expect("session cookie set");

    let html = body_text(app.get("/", Some(&cookie)).await).await;
    assert!(html.contains("Signed in as <strong>leo</strong>"));
}

#[tokio::test]
async fn duplicate_username_is_a_field_error() {
    let app = TestApp::new();
    app.seed_user("leo").await;

    let response = app
        .post_form(
            "/auth/signup/",
            None,
            &[
                ("username", "leo"),
                ("email", "other@example.com"),
                ("password1", PASSWORD),
                ("password2", PASSWORD),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).is_none());
    let html = body_text(response).await;
    assert!(html.contains("A user with that username already exists."));
}

#[tokio::test]
async fn wrong_password_rerenders_login_with_a_generic_error() {
    let app = TestApp::new();
    app.seed_user_with_password("leo").await;

    let response = app
        .post_form(
            "/auth/login/",
            None,
            &[("username", "leo"), ("password", "not the password")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).is_none());
    let html = body_text(response).await;
    assert!(html.contains("Please enter a correct username and password."));
    assert!(html.contains("value=\"leo\""), "username is kept");
}

#[tokio::test]
async fn login_returns_to_the_requested_page() {
    let app = TestApp::new();
    app.seed_user_with_password("leo").await;

    let page = app.get("/auth/login/?next=%2Ffollow%2F", None).await;
    assert_eq!(page.status(), StatusCode::OK);
    assert!(body_text(page).await.contains("name=\"next\""));

    let response = app
        .post_form(
            "/auth/login/",
            None,
            &[("username", "leo"), ("password", PASSWORD), ("next", "/follow/")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/follow/");
    let cookie = session_cookie(&response).expect("session cookie set");

    let follow = app.get("/follow/", Some(&cookie)).await;
    assert_eq!(follow.status(), StatusCode::OK);
}

#[tokio::test]
async fn offsite_next_falls_back_to_home() {
    let app = TestApp::new();
    app.seed_user_with_password("leo").await;

    let response = app
        .post_form(
            "/auth/login/",
            None,
            &[
                ("username", "leo"),
                ("password", PASSWORD),
                ("next", "https://evil.example/"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = TestApp::new();
    let leo = app.seed_user("leo").await;
    let cookie = app.login(&leo).await;

    let response = app.get("/auth/logout/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.starts_with(&format!("{COOKIE_NAME}=;")));
    assert!(cleared, "logout clears the cookie");
    assert!(body_text(response).await.contains("You have been logged out"));

    let after = app.get("/follow/", Some(&cookie)).await;
    assert_eq!(after.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn forged_session_tokens_are_anonymous() {
    let app = TestApp::new();
    let leo = app.seed_user("leo").await;
    let cookie = app.login(&leo).await;
    let forged = format!("{}x", &cookie[..cookie.len() - 1]);

    let response = app.get("/follow/", Some(&forged)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn signing_in_sweeps_abandoned_expired_sessions() {
    let app = TestApp::new();
    let leo = app.seed_user("leo").await;
    let ann = app.seed_user("ann").await;
    app.repos.insert_expired_session(ann.id, "abandoned1").await;
    app.repos.insert_expired_session(leo.id, "abandoned2").await;
    let live = app.login(&ann).await;
    assert_eq!(app.repos.session_count().await, 1);

    app.login(&leo).await;
    assert_eq!(app.repos.session_count().await, 2);
    let html = body_text(app.get("/", Some(&live)).await).await;
    assert!(html.contains("Signed in as"));
}
