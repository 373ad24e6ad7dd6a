use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AuthUser, Role},
    error::{ApiError, ApiResult},
    guard::{require_owner_or_admin, require_role},
    models::{
        self, Bootcamp, CreateBootcampRequest, CreateReviewRequest, CreateUserRequest,
        DataEnvelope, Review, UpdateBootcampRequest, UpdateReviewRequest, UpdateUserRequest, User,
    },
    query::{Filter, ListEnvelope, ListQuery},
};

// Every handler here follows the same five steps: parse, (list) build the
// query plan, (mutation) fetch then guard then persist, normalize failures
// via `ApiError`, wrap the success envelope. No business logic beyond that.

// --- Bootcamps ---

/// get_bootcamps
///
/// [Public Route] Lists bootcamps through the generic query pipeline:
/// `?averagecost[gt]=5000&sort=-name&select=name,housing&page=2&limit=10`.
#[utoipa::path(
    get,
    path = "/bootcamps",
    responses((status = 200, description = "Bootcamp listing", body = ListEnvelope))
)]
pub async fn get_bootcamps(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<ListEnvelope>> {
    let query = ListQuery::build(&params, &models::BOOTCAMP_FIELDS, Vec::new())?;
    let result = state.repo.list_bootcamps(&query).await?;
    Ok(Json(ListEnvelope::new(result, &query)?))
}

/// get_bootcamp
///
/// [Public Route] Single bootcamp by id.
#[utoipa::path(
    get,
    path = "/bootcamps/{id}",
    params(("id" = Uuid, Path, description = "Bootcamp ID")),
    responses(
        (status = 200, description = "Found", body = Bootcamp),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_bootcamp(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DataEnvelope<Bootcamp>>> {
    let bootcamp = state
        .repo
        .get_bootcamp(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Bootcamp not found with id of {id}")))?;
    Ok(Json(DataEnvelope::new(bootcamp)))
}

/// create_bootcamp
///
/// [Authenticated Route] Publishes a new bootcamp. Restricted to the
/// `publisher` and `admin` roles; a non-admin publisher may only have one
/// bootcamp on the platform.
#[utoipa::path(
    post,
    path = "/bootcamps",
    request_body = CreateBootcampRequest,
    responses(
        (status = 201, description = "Created", body = Bootcamp),
        (status = 400, description = "Validation failed or already published"),
        (status = 403, description = "Role not permitted")
    )
)]
pub async fn create_bootcamp(
    actor: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateBootcampRequest>,
) -> ApiResult<(StatusCode, Json<DataEnvelope<Bootcamp>>)> {
    require_role(&actor, &[Role::Publisher, Role::Admin])?;
    payload.validate()?;

    if actor.role != Role::Admin && state.repo.owner_has_bootcamp(actor.id).await? {
        return Err(ApiError::invalid(format!(
            "The user with ID {} has already published a bootcamp",
            actor.id
        )));
    }

    let bootcamp = state.repo.create_bootcamp(payload, actor.id).await?;
    Ok((StatusCode::CREATED, Json(DataEnvelope::new(bootcamp))))
}

/// update_bootcamp
///
/// [Authenticated Route] Owner-or-admin partial update. The guard runs
/// strictly after the fetch and strictly before the write.
#[utoipa::path(
    put,
    path = "/bootcamps/{id}",
    params(("id" = Uuid, Path, description = "Bootcamp ID")),
    request_body = UpdateBootcampRequest,
    responses(
        (status = 200, description = "Updated", body = Bootcamp),
        (status = 401, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_bootcamp(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBootcampRequest>,
) -> ApiResult<Json<DataEnvelope<Bootcamp>>> {
    let bootcamp = state
        .repo
        .get_bootcamp(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Bootcamp not found with id of {id}")))?;

    require_owner_or_admin(&actor, bootcamp.owner_id, "bootcamp")?;
    payload.validate()?;

    let updated = state
        .repo
        .update_bootcamp(id, payload)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Bootcamp not found with id of {id}")))?;
    Ok(Json(DataEnvelope::new(updated)))
}

/// delete_bootcamp
///
/// [Authenticated Route] Owner-or-admin delete; the bootcamp's reviews are
/// removed with it (FK cascade).
#[utoipa::path(
    delete,
    path = "/bootcamps/{id}",
    params(("id" = Uuid, Path, description = "Bootcamp ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 401, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_bootcamp(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DataEnvelope<serde_json::Value>>> {
    let bootcamp = state
        .repo
        .get_bootcamp(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Bootcamp not found with id of {id}")))?;

    require_owner_or_admin(&actor, bootcamp.owner_id, "bootcamp")?;

    state.repo.delete_bootcamp(id).await?;
    Ok(Json(DataEnvelope::new(serde_json::json!({}))))
}

// --- Reviews ---

/// get_reviews
///
/// [Public Route] Lists all reviews through the pipeline. Supports
/// `populate=bootcamp` to embed the parent bootcamp's name and description.
#[utoipa::path(
    get,
    path = "/reviews",
    responses((status = 200, description = "Review listing", body = ListEnvelope))
)]
pub async fn get_reviews(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<ListEnvelope>> {
    let query = ListQuery::build(&params, &models::REVIEW_FIELDS, Vec::new())?;
    let result = state.repo.list_reviews(&query).await?;
    Ok(Json(ListEnvelope::new(result, &query)?))
}

/// get_bootcamp_reviews
///
/// [Public Route] Reviews of one bootcamp. Same pipeline as `get_reviews`
/// with a base filter pinning `bootcamp_id`; the client cannot override it.
#[utoipa::path(
    get,
    path = "/bootcamps/{id}/reviews",
    params(("id" = Uuid, Path, description = "Bootcamp ID")),
    responses((status = 200, description = "Review listing", body = ListEnvelope))
)]
pub async fn get_bootcamp_reviews(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<Uuid>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<ListEnvelope>> {
    let base = vec![Filter::eq_uuid("bootcamp_id", bootcamp_id)];
    let query = ListQuery::build(&params, &models::REVIEW_FIELDS, base)?;
    let result = state.repo.list_reviews(&query).await?;
    Ok(Json(ListEnvelope::new(result, &query)?))
}

/// get_review
///
/// [Public Route] Single review, always populated with its bootcamp summary.
#[utoipa::path(
    get,
    path = "/reviews/{id}",
    params(("id" = Uuid, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Found", body = Review),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DataEnvelope<Review>>> {
    let review = state
        .repo
        .get_review(id, true)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No review found with the id of {id}")))?;
    Ok(Json(DataEnvelope::new(review)))
}

/// add_review
///
/// [Authenticated Route] Adds a review under a bootcamp. The parent must
/// exist, and the authenticated user becomes the owner.
#[utoipa::path(
    post,
    path = "/bootcamps/{id}/reviews",
    params(("id" = Uuid, Path, description = "Bootcamp ID")),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Created", body = Review),
        (status = 404, description = "No such bootcamp")
    )
)]
pub async fn add_review(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(bootcamp_id): Path<Uuid>,
    Json(payload): Json<CreateReviewRequest>,
) -> ApiResult<(StatusCode, Json<DataEnvelope<Review>>)> {
    require_role(&actor, &[Role::User, Role::Admin])?;
    payload.validate()?;

    state.repo.get_bootcamp(bootcamp_id).await?.ok_or_else(|| {
        ApiError::not_found(format!("No bootcamp with the id of {bootcamp_id}"))
    })?;

    let review = state
        .repo
        .create_review(payload, bootcamp_id, actor.id)
        .await?;
    Ok((StatusCode::CREATED, Json(DataEnvelope::new(review))))
}

/// update_review
///
/// [Authenticated Route] Owner-or-admin update of a review.
#[utoipa::path(
    put,
    path = "/reviews/{id}",
    params(("id" = Uuid, Path, description = "Review ID")),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Updated", body = Review),
        (status = 401, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_review(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateReviewRequest>,
) -> ApiResult<Json<DataEnvelope<Review>>> {
    let review = state
        .repo
        .get_review(id, false)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No review found with the id of {id}")))?;

    require_owner_or_admin(&actor, review.owner_id, "review")?;
    payload.validate()?;

    let updated = state
        .repo
        .update_review(id, payload)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No review found with the id of {id}")))?;
    Ok(Json(DataEnvelope::new(updated)))
}

/// delete_review
///
/// [Authenticated Route] Owner-or-admin delete of a review.
#[utoipa::path(
    delete,
    path = "/reviews/{id}",
    params(("id" = Uuid, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 401, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_review(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DataEnvelope<serde_json::Value>>> {
    let review = state
        .repo
        .get_review(id, false)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No review found with the id of {id}")))?;

    require_owner_or_admin(&actor, review.owner_id, "review")?;

    state.repo.delete_review(id).await?;
    Ok(Json(DataEnvelope::new(serde_json::json!({}))))
}

// --- Users (admin only) ---

/// get_users
///
/// [Admin Route] Lists users through the pipeline.
#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "User listing", body = ListEnvelope),
        (status = 403, description = "Admin only")
    )
)]
pub async fn get_users(
    actor: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<ListEnvelope>> {
    require_role(&actor, &[Role::Admin])?;
    let query = ListQuery::build(&params, &models::USER_FIELDS, Vec::new())?;
    let result = state.repo.list_users(&query).await?;
    Ok(Json(ListEnvelope::new(result, &query)?))
}

/// get_user_by_id
///
/// [Admin Route] Single user by id.
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = User),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_user_by_id(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DataEnvelope<User>>> {
    require_role(&actor, &[Role::Admin])?;
    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No user with the id of {id}")))?;
    Ok(Json(DataEnvelope::new(user)))
}

/// create_user
///
/// [Admin Route] Creates a local user record (credentials stay with the
/// external auth provider). A duplicate email surfaces as the uniform 400
/// duplicate-value error.
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = User),
        (status = 400, description = "Validation failed or duplicate email")
    )
)]
pub async fn create_user(
    actor: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<DataEnvelope<User>>)> {
    require_role(&actor, &[Role::Admin])?;
    payload.validate()?;
    let user = state.repo.create_user(payload).await?;
    Ok((StatusCode::CREATED, Json(DataEnvelope::new(user))))
}

/// update_user
///
/// [Admin Route] Partial update of a user record.
#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_user(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<Json<DataEnvelope<User>>> {
    require_role(&actor, &[Role::Admin])?;
    payload.validate()?;
    let user = state
        .repo
        .update_user(id, payload)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No user with the id of {id}")))?;
    Ok(Json(DataEnvelope::new(user)))
}

/// delete_user
///
/// [Admin Route] Deletes a user record.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_user(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DataEnvelope<serde_json::Value>>> {
    require_role(&actor, &[Role::Admin])?;
    if !state.repo.delete_user(id).await? {
        return Err(ApiError::not_found(format!("No user with the id of {id}")));
    }
    Ok(Json(DataEnvelope::new(serde_json::json!({}))))
}

// --- Session ---

/// get_me
///
/// [Authenticated Route] The authenticated user's own record.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = User))
)]
pub async fn get_me(
    actor: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<DataEnvelope<User>>> {
    let user = state
        .repo
        .get_user(actor.id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Not authorized to access this route"))?;
    Ok(Json(DataEnvelope::new(user)))
}
