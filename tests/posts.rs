mod support;

use axum::http::StatusCode;
use support::{MultipartBody, TINY_GIF, TestApp, body_text, location};

#[tokio::test]
async fn creating_a_post_redirects_to_the_authors_profile() {
    let app = TestApp::new();
    let leo = app.seed_user("leo").await;
    let cats = app.seed_group("Cats", "cats").await;
    let cookie = app.login(&leo).await;

    let form = MultipartBody::default()
        .text("text", "my first post")
        .text("group", &cats.id.to_string())
        .file("image", "", b"");
    let response = app.post_multipart("/create/", Some(&cookie), &form).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/leo/");

    let html = body_text(app.get("/group/cats/", None).await).await;
    assert!(html.contains("my first post"));
}

#[tokio::test]
async fn blank_post_rerenders_the_form_with_an_error() {
    let app = TestApp::new();
    let leo = app.seed_user("leo").await;
    let cookie = app.login(&leo).await;

    let form = MultipartBody::default().text("text", "   ");
    let response = app.post_multipart("/create/", Some(&cookie), &form).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("This field is required."));
    assert!(html.contains("New post"));
}

#[tokio::test]
async fn unknown_group_and_bad_image_are_field_errors() {
    let app = TestApp::new();
    let leo = app.seed_user("leo").await;
    let cookie = app.login(&leo).await;

    let form = MultipartBody::default()
        .text("text", "text is fine")
        .text("group", "00000000-0000-0000-0000-000000000000")
        .file("image", "notes.txt", b"definitely not an image");
    let response = app.post_multipart("/create/", Some(&cookie), &form).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Select a valid choice."));
    assert!(html.contains("Upload a valid image."));
    assert!(html.contains("text is fine"), "submitted text is kept");
}

#[tokio::test]
async fn uploaded_images_are_served_from_media() {
    let app = TestApp::new();
    let leo = app.seed_user("leo").await;
    let cookie = app.login(&leo).await;

    let form = MultipartBody::default()
        .text("text", "with a picture")
        .file("image", "pixel.gif", TINY_GIF);
    let response = app.post_multipart("/create/", Some(&cookie), &form).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let html = body_text(app.get("/profile/leo/", None).await).await;
    let start = html.find("/media/posts/").expect("image url rendered");
    let end = start + html[start..].find('"').expect("closing quote");
    let media = app.get(&html[start..end], None).await;
    assert_eq!(media.status(), StatusCode::OK);
    assert_eq!(
        media.headers().get("content-type").map(|v| v.as_bytes()),
        Some(&b"image/gif"[..])
    );
}

#[tokio::test]
async fn media_rejects_traversal_and_missing_files() {
    let app = TestApp::new();

    let missing = app.get("/media/posts/nope.gif", None).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let traversal = app.get("/media/../Cargo.toml", None).await;
    assert_eq!(traversal.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_author_edit_redirects_without_writing() {
    let app = TestApp::new();
    let leo = app.seed_user("leo").await;
    let ann = app.seed_user("ann").await;
    let post = app.seed_post(&leo, "original text", None).await;
    let cookie = app.login(&ann).await;
    let edit_uri = format!("/posts/{}/edit/", post.id);
    let detail_uri = format!("/posts/{}/", post.id);

    let page = app.get(&edit_uri, Some(&cookie)).await;
    assert_eq!(page.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&page), detail_uri);

    let form = MultipartBody::default().text("text", "hijacked");
    let response = app.post_multipart(&edit_uri, Some(&cookie), &form).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), detail_uri);
    assert_eq!(
        app.repos.post_text(post.id).await.as_deref(),
        Some("original text")
    );
}

#[tokio::test]
async fn author_edit_updates_text_and_redirects_to_detail() {
    let app = TestApp::new();
    let leo = app.seed_user("leo").await;
    let post = app.seed_post(&leo, "original text", None).await;
    let cookie = app.login(&leo).await;
    let edit_uri = format!("/posts/{}/edit/", post.id);

    let page = body_text(app.get(&edit_uri, Some(&cookie)).await).await;
    assert!(page.contains("Edit post"));
    assert!(page.contains("original text"));

    let form = MultipartBody::default().text("text", "edited text");
    let response = app.post_multipart(&edit_uri, Some(&cookie), &form).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/posts/{}/", post.id));
    assert_eq!(
        app.repos.post_text(post.id).await.as_deref(),
        Some("edited text")
    );
}

#[tokio::test]
async fn blank_comment_rerenders_detail_without_inserting() {
    let app = TestApp::new();
    let leo = app.seed_user("leo").await;
    let post = app.seed_post(&leo, "discuss me", None).await;
    let cookie = app.login(&leo).await;

    let response = app
        .post_form(
            &format!("/posts/{}/comment/", post.id),
            Some(&cookie),
            &[("text", "  ")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("This field is required."));
    assert!(html.contains("discuss me"));
    assert_eq!(app.repos.comment_count(post.id).await, 0);
}

#[tokio::test]
async fn anonymous_comment_is_sent_to_login() {
    let app = TestApp::new();
    let leo = app.seed_user("leo").await;
    let post = app.seed_post(&leo, "discuss me", None).await;

    let uri = format!("/posts/{}/comment/", post.id);
    let response = app.post_form(&uri, None, &[("text", "hi")]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/auth/login/?next="));
    assert_eq!(app.repos.comment_count(post.id).await, 0);
}

#[tokio::test]
async fn failed_post_insert_leaves_no_stored_image() {
    let app = TestApp::new();
    let leo = app.seed_user("leo").await;
    let cookie = app.login(&leo).await;
    app.repos.fail_post_writes();

    let form = MultipartBody::default()
        .text("text", "never saved")
        .file("image", "pixel.gif", TINY_GIF);
    let response = app.post_multipart("/create/", Some(&cookie), &form).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(app.media_files("posts").is_empty());
}

#[tokio::test]
async fn replacing_an_image_removes_the_previous_file() {
    let app = TestApp::new();
    let leo = app.seed_user("leo").await;
    let cookie = app.login(&leo).await;

    let form = MultipartBody::default()
        .text("text", "first picture")
        .file("image", "first.gif", TINY_GIF);
    app.post_multipart("/create/", Some(&cookie), &form).await;
    let files = app.media_files("posts");
    assert_eq!(files.len(), 1);

    let post_id = app.repos.newest_post().await.expect("post created");
    let first_image = app.repos.post_image(post_id).await.expect("stored image");

    let edit_uri = format!("/posts/{post_id}/edit/");
    let form = MultipartBody::default()
        .text("text", "second picture")
        .file("image", "second.gif", TINY_GIF);
    let response = app.post_multipart(&edit_uri, Some(&cookie), &form).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let second_image = app.repos.post_image(post_id).await.expect("stored image");
    assert_ne!(first_image, second_image);
    let files = app.media_files("posts");
    assert_eq!(files.len(), 1);
    assert!(!files[0].ends_with(&first_image));

    app.repos.fail_post_writes();
    let form = MultipartBody::default()
        .text("text", "third picture")
        .file("image", "third.gif", TINY_GIF);
    let response = app.post_multipart(&edit_uri, Some(&cookie), &form).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.media_files("posts"), files);
}
