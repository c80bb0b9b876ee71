//! HTTP handlers and route configuration.

mod events;
mod feed;
mod health;
mod posts;
mod social;

use actix_web::web;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            // Public routes
            .route("/health", web::get().to(health::health_check))
            .route("/events", web::get().to(events::stream_events))
            .route("/feed", web::get().to(feed::get_feed))
            // Posts
            .service(
                web::scope("/posts")
                    .route("", web::post().to(posts::create_post))
                    .route("/{id}", web::get().to(posts::get_post))
                    .route("/{id}", web::delete().to(posts::delete_post))
                    .route("/{id}/archive", web::post().to(posts::archive_post))
                    .route("/{id}/interest", web::post().to(posts::toggle_interest))
                    .route("/{id}/interest", web::put().to(posts::set_interest)),
            )
            // Social graph
            .route("/following/{user_id}", web::put().to(social::follow))
            .route("/following/{user_id}", web::delete().to(social::unfollow)),
    );
}

#[cfg(all(test, feature = "auth"))]
pub(crate) mod testing {
    use std::sync::Arc;
    use std::time::Duration;

    use feed_core::ports::TokenService;
    use feed_engine::EngineConfig;
    use feed_infra::{JwtConfig, JwtTokenService, SimulatedReactionConfig};
    use uuid::Uuid;

    use crate::state::AppState;

    /// In-memory state plus a token service to mint callers with.
    pub struct TestApp {
        pub state: AppState,
        tokens: Arc<JwtTokenService>,
    }

    impl TestApp {
        pub async fn new() -> Self {
            let tokens = Arc::new(JwtTokenService::new(JwtConfig::default()));
            let state = AppState::in_memory(
                EngineConfig::default(),
                SimulatedReactionConfig {
                    latency: Duration::from_millis(10),
                },
                Some(tokens.clone() as Arc<dyn TokenService>),
            )
            .await;
            Self { state, tokens }
        }

        /// `Authorization` header for a signed-in user.
        pub fn bearer(&self, user_id: Uuid, name: &str) -> (&'static str, String) {
            let token = self.tokens.generate_token(user_id, name).unwrap();
            ("Authorization", format!("Bearer {token}"))
        }
    }
}
