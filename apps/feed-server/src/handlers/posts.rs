//! Post handlers.

use actix_web::{HttpRequest, HttpResponse, web};

use feed_core::FeedError;
use feed_core::domain::{Attachment, Identity, Post, PostId, PostStatus, SubmissionRequest, Visibility};
use feed_engine::InterestState;
use feed_shared::dto::{
    AttachmentDto, CreatePostRequest, InterestResponse, PostResponse, SetInterestRequest,
    SubmissionResponse,
};

use crate::middleware::auth::Caller;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// POST /api/posts
///
/// 201 for a new post, 200 when the idempotency key replays an earlier one.
pub async fn create_post(
    state: web::Data<AppState>,
    caller: Caller,
    req: HttpRequest,
    body: web::Json<CreatePostRequest>,
) -> AppResult<HttpResponse> {
    let body = body.into_inner();

    let header_key = match req.headers().get(IDEMPOTENCY_HEADER) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| AppError::BadRequest("Idempotency-Key is not valid text".to_string()))?
                .to_string(),
        )
        .filter(|key| !key.trim().is_empty()),
        None => None,
    };

    let request = SubmissionRequest {
        content: body.content,
        attachments: body
            .attachments
            .into_iter()
            .map(|a| Attachment {
                url: a.url,
                media_type: a.media_type,
            })
            .collect(),
        scheduled_for: body.scheduled_for,
        idempotency_key: header_key.or(body.idempotency_key).unwrap_or_default(),
        visibility: parse_visibility(body.visibility.as_deref())?,
        community_id: body.community_id,
    };

    let submitted = state.posts.submit(&caller, request).await?;
    let response = SubmissionResponse {
        post: post_response(&submitted.post, caller.identity()),
        replayed: submitted.replayed,
    };

    if submitted.replayed {
        Ok(HttpResponse::Ok().json(response))
    } else {
        Ok(HttpResponse::Created().json(response))
    }
}

/// GET /api/posts/{id}
///
/// Scheduled and archived posts are visible to their author only; deleted
/// posts are gone.
pub async fn get_post(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let id = PostId(path.into_inner());
    let post = state.posts.get(id).await?;

    let visible = match post.status {
        PostStatus::Published => true,
        PostStatus::Scheduled | PostStatus::Archived => {
            caller.identity().is_some_and(|me| me.user_id == post.author_id)
        }
        PostStatus::Deleted => false,
    };
    if !visible {
        return Err(FeedError::NotFound(id).into());
    }

    Ok(HttpResponse::Ok().json(post_response(&post, caller.identity())))
}

/// POST /api/posts/{id}/archive
pub async fn archive_post(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let post = state.posts.archive(&caller, PostId(path.into_inner())).await?;
    Ok(HttpResponse::Ok().json(post_response(&post, caller.identity())))
}

/// DELETE /api/posts/{id}
pub async fn delete_post(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    state.posts.delete(&caller, PostId(path.into_inner())).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/posts/{id}/interest
pub async fn toggle_interest(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let interest = state
        .posts
        .toggle_interest(&caller, PostId(path.into_inner()))
        .await?;
    Ok(HttpResponse::Ok().json(interest_response(interest)))
}

/// PUT /api/posts/{id}/interest
pub async fn set_interest(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<u64>,
    body: web::Json<SetInterestRequest>,
) -> AppResult<HttpResponse> {
    let interest = state
        .posts
        .set_interest(&caller, PostId(path.into_inner()), body.interested)
        .await?;
    Ok(HttpResponse::Ok().json(interest_response(interest)))
}

fn parse_visibility(raw: Option<&str>) -> Result<Visibility, AppError> {
    match raw.map(str::to_lowercase).as_deref() {
        None | Some("public") => Ok(Visibility::Public),
        Some("connections") => Ok(Visibility::Connections),
        Some("private") => Ok(Visibility::Private),
        Some(other) => Err(FeedError::validation(format!("unknown visibility '{other}'")).into()),
    }
}

fn visibility_str(visibility: Visibility) -> &'static str {
    match visibility {
        Visibility::Public => "public",
        Visibility::Connections => "connections",
        Visibility::Private => "private",
    }
}

/// Render a post for `viewer`.
pub(super) fn post_response(post: &Post, viewer: Option<&Identity>) -> PostResponse {
    PostResponse {
        id: post.id.0,
        author_id: post.author_id,
        author_name: post.author_name.clone(),
        content: post.content.clone(),
        attachments: post
            .attachments
            .iter()
            .map(|a| AttachmentDto {
                url: a.url.clone(),
                media_type: a.media_type.clone(),
            })
            .collect(),
        status: post.status.to_string(),
        created_at: post.created_at,
        scheduled_for: post.scheduled_for,
        visibility: visibility_str(post.visibility).to_string(),
        community_id: post.community_id.clone(),
        interest_count: post.interest_count(),
        interested: viewer.is_some_and(|me| post.is_interested(&me.user_id)),
    }
}

fn interest_response(state: InterestState) -> InterestResponse {
    InterestResponse {
        post_id: state.post_id.0,
        interested: state.interested,
        count: state.count,
        pending: state.pending,
    }
}
