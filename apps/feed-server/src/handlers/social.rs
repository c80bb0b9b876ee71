//! Follow / unfollow handlers backing the `following` feed.

use actix_web::{HttpResponse, web};
use feed_core::ports::AuthProvider;
use uuid::Uuid;

use crate::middleware::auth::Caller;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// PUT /api/following/{user_id}
pub async fn follow(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let me = caller.require()?;
    let followee = path.into_inner();
    if state.social.follow(me.user_id, followee).await {
        tracing::debug!(follower = %me.user_id, followee = %followee, "Now following");
    }
    Ok(HttpResponse::NoContent().finish())
}

/// DELETE /api/following/{user_id}
pub async fn unfollow(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let me = caller.require()?;
    let followee = path.into_inner();
    if state.social.unfollow(me.user_id, followee).await {
        tracing::debug!(follower = %me.user_id, followee = %followee, "Unfollowed");
    }
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(all(test, feature = "auth"))]
mod tests {
    use actix_web::{App, http::StatusCode, test};
    use feed_shared::dto::FeedPageResponse;
    use serde_json::json;

    use super::*;
    use crate::handlers::configure_routes;
    use crate::handlers::testing::TestApp;

    #[actix_web::test]
    async fn test_following_feed_tracks_follows() {
        let t = TestApp::new().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(t.state.clone()))
                .configure(configure_routes),
        )
        .await;
        let friend = Uuid::new_v4();
        let me = t.bearer(Uuid::new_v4(), "Grace");

        let req = test::TestRequest::post()
            .uri("/api/posts")
            .insert_header(t.bearer(friend, "Ada"))
            .set_json(json!({ "content": "hi", "idempotency_key": "k" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let following = || {
            test::TestRequest::get()
                .uri("/api/feed?selector=following")
                .insert_header(me.clone())
                .to_request()
        };
        let before: FeedPageResponse = test::call_and_read_body_json(&app, following()).await;
        assert!(before.posts.is_empty());

        let req = test::TestRequest::put()
            .uri(&format!("/api/following/{friend}"))
            .insert_header(me.clone())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

        let after: FeedPageResponse = test::call_and_read_body_json(&app, following()).await;
        assert_eq!(after.posts.len(), 1);
        assert_eq!(after.posts[0].author_id, friend);
    }

    #[actix_web::test]
    async fn test_anonymous_follow_is_unauthorized() {
        let t = TestApp::new().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(t.state.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::put()
            .uri(&format!("/api/following/{}", Uuid::new_v4()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }
}
