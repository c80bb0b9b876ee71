//! Feed handler.

use actix_web::{HttpResponse, web};

use feed_core::domain::{Cursor, FeedQuery, FeedSelector};
use feed_shared::dto::{FeedPageResponse, FeedParams};

use super::posts::post_response;
use crate::middleware::auth::Caller;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/feed?selector=&cursor=&limit=
pub async fn get_feed(
    state: web::Data<AppState>,
    caller: Caller,
    params: web::Query<FeedParams>,
) -> AppResult<HttpResponse> {
    let params = params.into_inner();

    let selector: FeedSelector = params.selector.as_deref().unwrap_or("all").parse()?;
    let mut query = FeedQuery::new(selector);
    if let Some(raw) = params.cursor.as_deref().filter(|c| !c.is_empty()) {
        query = query.after(Cursor::decode(raw)?);
    }
    if let Some(limit) = params.limit {
        query = query.with_page_size(limit);
    }

    let page = state.posts.feed(&caller, &query).await?;
    Ok(HttpResponse::Ok().json(FeedPageResponse {
        posts: page
            .posts
            .iter()
            .map(|p| post_response(p, caller.identity()))
            .collect(),
        next_cursor: page.next_cursor.map(|c| c.encode()),
        notice: page.notice,
    }))
}

#[cfg(all(test, feature = "auth"))]
mod tests {
    use actix_web::{App, http::StatusCode, test};
    use chrono::{Duration, Utc};
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::handlers::configure_routes;
    use crate::handlers::testing::TestApp;

    #[actix_web::test]
    async fn test_pages_follow_the_cursor() {
        let t = TestApp::new().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(t.state.clone()))
                .configure(configure_routes),
        )
        .await;
        let author = t.bearer(Uuid::new_v4(), "Ada");

        for i in 0..3 {
            let req = test::TestRequest::post()
                .uri("/api/posts")
                .insert_header(author.clone())
                .set_json(json!({ "content": format!("post {i}"), "idempotency_key": format!("k{i}") }))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
        }

        let req = test::TestRequest::get().uri("/api/feed?limit=2").to_request();
        let first: FeedPageResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(first.posts.len(), 2);
        assert_eq!(first.posts[0].content.as_deref(), Some("post 2"));
        let cursor = first.next_cursor.expect("more posts");

        let req = test::TestRequest::get()
            .uri(&format!("/api/feed?limit=2&cursor={cursor}"))
            .to_request();
        let second: FeedPageResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(second.posts.len(), 1);
        assert_eq!(second.posts[0].content.as_deref(), Some("post 0"));
        assert!(second.next_cursor.is_none());
    }

    #[actix_web::test]
    async fn test_scheduled_feed_is_private_to_the_author() {
        let t = TestApp::new().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(t.state.clone()))
                .configure(configure_routes),
        )
        .await;
        let author = t.bearer(Uuid::new_v4(), "Ada");

        let req = test::TestRequest::post()
            .uri("/api/posts")
            .insert_header(author.clone())
            .set_json(json!({
                "content": "Later",
                "scheduled_for": Utc::now() + Duration::hours(1),
                "idempotency_key": "later",
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::get().uri("/api/feed").to_request();
        let all: FeedPageResponse = test::call_and_read_body_json(&app, req).await;
        assert!(all.posts.is_empty());

        let req = test::TestRequest::get()
            .uri("/api/feed?selector=scheduled")
            .insert_header(author)
            .to_request();
        let scheduled: FeedPageResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(scheduled.posts.len(), 1);
        assert_eq!(scheduled.posts[0].status, "scheduled");

        let req = test::TestRequest::get()
            .uri("/api/feed?selector=scheduled")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_unknown_selector_and_bad_cursor_are_rejected() {
        let t = TestApp::new().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(t.state.clone()))
                .configure(configure_routes),
        )
        .await;

        for uri in ["/api/feed?selector=trending", "/api/feed?cursor=%21%21"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
        }
    }
}
