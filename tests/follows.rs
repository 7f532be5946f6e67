mod support;

use axum::http::StatusCode;
use support::{TestApp, body_text, location, post_cards};

#[tokio::test]
async fn following_twice_keeps_a_single_edge() {
    let app = TestApp::new();
    let leo = app.seed_user("leo").await;
    app.seed_user("ann").await;
    let cookie = app.login(&leo).await;

    for _ in 0..2 {
        let response = app.get("/profile/ann/follow/", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/profile/ann/");
    }

    assert_eq!(app.repos.follow_edges().await, 1);
    let html = body_text(app.get("/profile/ann/", Some(&cookie)).await).await;
    assert!(html.contains("Followers: 1"));
    assert!(html.contains(">Unfollow<"));
}

#[tokio::test]
async fn self_follow_is_a_silent_no_op() {
    let app = TestApp::new();
    let leo = app.seed_user("leo").await;
    let cookie = app.login(&leo).await;

    let response = app.get("/profile/leo/follow/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/leo/");
    assert_eq!(app.repos.follow_edges().await, 0);

    let html = body_text(app.get("/profile/leo/", Some(&cookie)).await).await;
    assert!(!html.contains(">Follow<"), "own profile has no follow button");
}

#[tokio::test]
async fn unfollow_without_an_edge_still_redirects() {
    let app = TestApp::new();
    let leo = app.seed_user("leo").await;
    app.seed_user("ann").await;
    let cookie = app.login(&leo).await;

    let response = app.get("/profile/ann/unfollow/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/ann/");

    app.get("/profile/ann/follow/", Some(&cookie)).await;
    assert_eq!(app.repos.follow_edges().await, 1);
    app.get("/profile/ann/unfollow/", Some(&cookie)).await;
    assert_eq!(app.repos.follow_edges().await, 0);
}

#[tokio::test]
async fn following_unknown_user_is_not_found() {
    let app = TestApp::new();
    let leo = app.seed_user("leo").await;
    let cookie = app.login(&leo).await;

    let response = app.get("/profile/ghost/follow/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn following_feed_flags_emptiness_and_lists_followed_authors() {
    let app = TestApp::new();
    let leo = app.seed_user("leo").await;
    let ann = app.seed_user("ann").await;
    let bob = app.seed_user("bob").await;
    app.seed_post(&ann, "from ann", None).await;
    app.seed_post(&bob, "from bob", None).await;
    let cookie = app.login(&leo).await;

    let empty = body_text(app.get("/follow/", Some(&cookie)).await).await;
    assert!(empty.contains("You are not following anyone"));
    assert_eq!(post_cards(&empty), 0);

    app.get("/profile/ann/follow/", Some(&cookie)).await;
    let html = body_text(app.get("/follow/", Some(&cookie)).await).await;
    assert_eq!(post_cards(&html), 1);
    assert!(html.contains("from ann"));
    assert!(!html.contains("from bob"));
    assert!(!html.contains("You are not following anyone"));
}

#[tokio::test]
async fn page_past_the_end_is_not_the_empty_state() {
    let app = TestApp::new();
    let leo = app.seed_user("leo").await;
    let ann = app.seed_user("ann").await;
    app.seed_post(&ann, "from ann", None).await;
    let cookie = app.login(&leo).await;
    app.get("/profile/ann/follow/", Some(&cookie)).await;

    for uri in ["/follow/?page=99", "/follow/?page=2&page=x"] {
        let response = app.get(uri, Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        let html = body_text(response).await;
        assert_eq!(post_cards(&html), 1, "{uri}");
        assert!(html.contains("from ann"), "{uri}");
        assert!(!html.contains("You are not following anyone"), "{uri}");
    }
}

#[tokio::test]
async fn protected_routes_redirect_to_login_with_next() {
    let app = TestApp::new();
    app.seed_user("ann").await;

    let cases = [
        ("/follow/", "/auth/login/?next=%2Ffollow%2F"),
        ("/follow/?page=2", "/auth/login/?next=%2Ffollow%2F%3Fpage%3D2"),
        ("/create/", "/auth/login/?next=%2Fcreate%2F"),
        (
            "/profile/ann/follow/",
            "/auth/login/?next=%2Fprofile%2Fann%2Ffollow%2F",
        ),
    ];
    for (uri, expected) in cases {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&response), expected, "{uri}");
    }
    assert_eq!(app.repos.follow_edges().await, 0);
}
