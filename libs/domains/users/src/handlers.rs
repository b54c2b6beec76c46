use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use axum_helpers::{
    AppError, JwtAuth, ValidatedJson,
    errors::responses::{
        BadRequestIdentifierResponse, BadRequestValidationResponse, ForbiddenResponse,
        InternalServerErrorResponse, NotFoundResponse, ServiceUnavailableResponse,
        UnauthorizedResponse,
    },
    jwt_auth_middleware, optional_jwt_auth_middleware,
};
use chrono::Utc;
use std::sync::Arc;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::auth::Claims;
use crate::error::UserError;
use crate::models::{
    Credentials, NewUser, PageQuery, Role, TokenResponse, UpdateUser, UserResponse,
};
use crate::repository::UserRepository;
use crate::service::UserService;

pub const TAG: &str = "users";

/// OpenAPI documentation for the Users API
#[derive(OpenApi)]
#[openapi(
    paths(create, token, query, query_by_id, query_by_email, update, delete),
    components(
        schemas(NewUser, UpdateUser, Credentials, TokenResponse, UserResponse, Role),
        responses(
            BadRequestValidationResponse,
            BadRequestIdentifierResponse,
            UnauthorizedResponse,
            ForbiddenResponse,
            NotFoundResponse,
            InternalServerErrorResponse,
            ServiceUnavailableResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = TAG, description = "User management and token issuance")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

struct UsersState<R: UserRepository> {
    service: UserService<R>,
    jwt: JwtAuth,
}

/// Users router. `POST /` and `POST /token` are public; every other route
/// needs a bearer token signed by `jwt`. Anonymous signups may only ask for
/// the `USER` role.
pub fn router<R: UserRepository + 'static>(service: UserService<R>, jwt: JwtAuth) -> Router {
    let auth = middleware::from_fn_with_state(jwt.clone(), jwt_auth_middleware::<Claims>);
    let maybe_auth =
        middleware::from_fn_with_state(jwt.clone(), optional_jwt_auth_middleware::<Claims>);
    let state = Arc::new(UsersState { service, jwt });

    let public = Router::new()
        .route("/", post(create))
        .route_layer(maybe_auth)
        .route("/token", post(token));

    let protected = Router::new()
        .route("/", get(query))
        .route("/{id}", get(query_by_id).put(update).delete(delete))
        .route("/email/{email}", get(query_by_email))
        .route_layer(auth);

    public.merge(protected).with_state(state)
}

/// Create a user (roles other than `USER` need an admin token)
#[utoipa::path(
    post,
    path = "",
    tag = TAG,
    request_body = NewUser,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security((), ("bearer_auth" = []))
)]
async fn create<R: UserRepository + 'static>(
    State(state): State<Arc<UsersState<R>>>,
    Extension(claims): Extension<Option<Claims>>,
    ValidatedJson(new_user): ValidatedJson<NewUser>,
) -> Result<impl IntoResponse, AppError> {
    let is_admin = claims.is_some_and(|c| c.is_authorized(Role::Admin));
    if new_user.requests_elevated_roles() && !is_admin {
        return Err(UserError::Forbidden.into());
    }

    let user = state.service.create(new_user, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Exchange credentials for a signed token
#[utoipa::path(
    post,
    path = "/token",
    tag = TAG,
    request_body = Credentials,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn token<R: UserRepository + 'static>(
    State(state): State<Arc<UsersState<R>>>,
    ValidatedJson(credentials): ValidatedJson<Credentials>,
) -> Result<Json<TokenResponse>, AppError> {
    let claims = state
        .service
        .authenticate(Utc::now(), &credentials.email, &credentials.password)
        .await?;

    let token = state.jwt.sign(&claims).map_err(|e| {
        AppError::from(UserError::unexpected(e.to_string()).context("signing token"))
    })?;

    Ok(Json(TokenResponse { token }))
}

/// List users, ordered by ID (admin only)
#[utoipa::path(
    get,
    path = "",
    tag = TAG,
    params(PageQuery),
    responses(
        (status = 200, description = "One page of users", body = Vec<UserResponse>),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn query<R: UserRepository + 'static>(
    State(state): State<Arc<UsersState<R>>>,
    Extension(claims): Extension<Claims>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    if !claims.is_authorized(Role::Admin) {
        return Err(UserError::Forbidden.into());
    }

    let users = state.service.query(page.page, page.rows).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Get a user by ID (self or admin)
#[utoipa::path(
    get,
    path = "/{id}",
    tag = TAG,
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 400, response = BadRequestIdentifierResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn query_by_id<R: UserRepository + 'static>(
    State(state): State<Arc<UsersState<R>>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.service.query_by_id(&claims, &id).await?;
    Ok(Json(user.into()))
}

/// Get a user by email (self or admin)
#[utoipa::path(
    get,
    path = "/email/{email}",
    tag = TAG,
    params(("email" = String, Path, description = "User email")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn query_by_email<R: UserRepository + 'static>(
    State(state): State<Arc<UsersState<R>>>,
    Extension(claims): Extension<Claims>,
    Path(email): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.service.query_by_email(&claims, &email).await?;
    Ok(Json(user.into()))
}

/// Update the attributes present in the body (self or admin)
#[utoipa::path(
    put,
    path = "/{id}",
    tag = TAG,
    params(("id" = String, Path, description = "User ID")),
    request_body = UpdateUser,
    responses(
        (status = 204, description = "User updated"),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn update<R: UserRepository + 'static>(
    State(state): State<Arc<UsersState<R>>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUser>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(update) = payload?;
    state.service.update(&claims, &id, update, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a user (self or admin)
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = TAG,
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, response = BadRequestIdentifierResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn delete<R: UserRepository + 'static>(
    State(state): State<Arc<UsersState<R>>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.service.delete(&claims, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
