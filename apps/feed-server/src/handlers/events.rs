//! Server-sent stream of committed post changes.

use actix_web::http::header;
use actix_web::{HttpResponse, web};
use futures::stream;
use tokio::sync::broadcast::error::RecvError;

use feed_core::ports::PostEvent;

use crate::state::AppState;

/// GET /api/events
///
/// One `text/event-stream` frame per [`PostEvent`], named after the event.
/// A subscriber that falls behind gets a `lagged` frame and should refetch.
pub async fn stream_events(state: web::Data<AppState>) -> HttpResponse {
    let receiver = state.events.subscribe();
    tracing::debug!(
        subscribers = state.events.subscriber_count(),
        "Event stream opened"
    );

    let frames = stream::unfold(receiver, |mut receiver| async move {
        loop {
            let frame = match receiver.recv().await {
                Ok(event) => match event_frame(&event) {
                    Some(frame) => frame,
                    None => continue,
                },
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Event stream subscriber lagged");
                    format!("event: lagged\ndata: {{\"missed\":{missed}}}\n\n")
                }
                Err(RecvError::Closed) => return None,
            };
            return Some((Ok::<_, actix_web::Error>(web::Bytes::from(frame)), receiver));
        }
    });

    HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/event-stream"))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(frames)
}

fn event_frame(event: &PostEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(data) => Some(format!("event: {}\ndata: {}\n\n", event.name(), data)),
        Err(e) => {
            tracing::error!(event = event.name(), error = %e, "Failed to encode event");
            None
        }
    }
}


#[cfg(all(test, feature = "auth"))]
mod stream_tests {
    use actix_web::{App, body::MessageBody, test};
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::handlers::configure_routes;
    use crate::handlers::testing::TestApp;

    #[actix_web::test]
    async fn test_created_post_reaches_the_stream() {
        let t = TestApp::new().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(t.state.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/events").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );
        let mut body = Box::pin(resp.into_body());

        let req = test::TestRequest::post()
            .uri("/api/posts")
            .insert_header(t.bearer(Uuid::new_v4(), "Ada"))
            .set_json(json!({ "content": "Hello", "idempotency_key": "k" }))
            .to_request();
        test::call_service(&app, req).await;

        let chunk = futures::future::poll_fn(|cx| body.as_mut().poll_next(cx))
            .await
            .unwrap()
            .unwrap();
        let text = String::from_utf8(chunk.to_vec()).unwrap();
        assert!(text.starts_with("event: created\n"), "{text}");
    }
}
