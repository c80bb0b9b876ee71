//! Bearer-token caller extraction.

use std::future::{Ready, ready};

use actix_web::http::StatusCode;
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, dev::Payload, http::header, web};

use feed_core::domain::Identity;
use feed_core::ports::{AuthError, AuthProvider, TokenService};
use feed_shared::ErrorResponse;

use crate::state::AppState;

/// The caller of a request.
///
/// No `Authorization` header means an anonymous caller; a header carrying a
/// bad or expired token is rejected outright rather than downgraded.
#[derive(Debug, Clone)]
pub struct Caller(pub Option<Identity>);

impl Caller {
    pub fn identity(&self) -> Option<&Identity> {
        self.0.as_ref()
    }
}

impl AuthProvider for Caller {
    fn current(&self) -> Option<Identity> {
        self.0.clone()
    }
}

/// Error type for authentication failures.
#[derive(Debug)]
pub struct AuthenticationError(pub AuthError);

impl std::fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ResponseError for AuthenticationError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        let error = match &self.0 {
            AuthError::TokenExpired => ErrorResponse::new(401, "Token Expired")
                .with_detail("Your access token has expired. Sign in again."),
            AuthError::InvalidToken(msg) => {
                ErrorResponse::new(401, "Invalid Token").with_detail(msg.clone())
            }
            AuthError::MissingAuth => ErrorResponse::unauthorized(),
        };

        HttpResponse::build(self.status_code()).json(error)
    }
}

impl FromRequest for Caller {
    type Error = AuthenticationError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(auth_header) = req.headers().get(header::AUTHORIZATION) else {
            return ready(Ok(Caller(None)));
        };

        let tokens = req
            .app_data::<web::Data<AppState>>()
            .and_then(|state| state.tokens.clone());
        let Some(tokens) = tokens else {
            tracing::debug!("Authorization header ignored, token service not configured");
            return ready(Ok(Caller(None)));
        };

        let auth_str = match auth_header.to_str() {
            Ok(s) => s,
            Err(_) => {
                return ready(Err(AuthenticationError(AuthError::InvalidToken(
                    "Invalid authorization header".to_string(),
                ))));
            }
        };

        let token = match auth_str.strip_prefix("Bearer ") {
            Some(t) => t,
            None => {
                return ready(Err(AuthenticationError(AuthError::InvalidToken(
                    "Expected Bearer token".to_string(),
                ))));
            }
        };

        ready(resolve(tokens.as_ref(), token))
    }
}

fn resolve(tokens: &dyn TokenService, token: &str) -> Result<Caller, AuthenticationError> {
    match tokens.validate_token(token) {
        Ok(claims) => Ok(Caller(Some(Identity::from(claims)))),
        Err(e) => {
            tracing::debug!(error = %e, "Rejected bearer token");
            Err(AuthenticationError(e))
        }
    }
}
