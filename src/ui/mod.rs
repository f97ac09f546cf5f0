// Server-rendered gallery UI: askama templates, redirect + flash flows.
// All real rules live in `auth` and `gallery`; handlers here only
// translate between HTTP and those calls.

pub mod flash;
mod templates;

use askama::Template;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, warn};

use crate::auth::{self, AuthError, AuthUser, MaybeUser};
use crate::gallery::{self, GalleryError, Upload};
use crate::storage::StoreError;
use crate::AppState;

pub use templates::*;

// Helper to render templates and handle errors
fn render_template<T: Template>(template: T) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Template error: {}", e),
        )
            .into_response(),
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let uploads_dir = state.config.media.uploads_dir.clone();
    // The store enforces the precise per-object limit; this is only a
    // backstop covering multipart framing overhead.
    let body_limit = state.config.media.max_upload_bytes as usize * 2;

    Router::new()
        .route("/", get(index))
        .route("/upload", get(upload_form).post(upload_submit))
        .route("/delete/:id", post(delete_photo))
        .route("/users/login", get(login_form).post(login_submit))
        .route("/users/register", get(register_form).post(register_submit))
        .route("/users/logout", get(logout))
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Gallery home - grouped photos, public
async fn index(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
) -> Response {
    let (jar, notice) = flash::take(jar);
    let (mut notice_kind, mut notice) = notice_fields(notice);
    let authenticated = user.is_some();

    let groups = match gallery::list_grouped(&state.db, authenticated).await {
        Ok(groups) => groups,
        Err(e) => {
            error!("Error fetching photos: {}", e);
            notice_kind = "error".to_string();
            notice = "Error loading photos".to_string();
            Vec::new()
        }
    };

    let template = IndexTemplate {
        groups,
        authenticated,
        username: user.map(|u| u.username).unwrap_or_default(),
        notice_kind,
        notice,
    };
    (jar, render_template(template)).into_response()
}

// Upload form
async fn upload_form(AuthUser(_user): AuthUser, jar: CookieJar) -> Response {
    let (jar, notice) = flash::take(jar);
    let (notice_kind, notice) = notice_fields(notice);
    let template = UploadTemplate { notice_kind, notice };
    (jar, render_template(template)).into_response()
}

/// Pull the `photo` file and optional `date` field out of the form.
async fn read_upload_form(
    multipart: &mut Multipart,
) -> Result<(Option<Upload>, Option<String>), axum::extract::multipart::MultipartError> {
    let mut payload = None;
    let mut date = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("photo") => {
                let mime = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    payload = Some(Upload {
                        bytes: bytes.to_vec(),
                        mime,
                    });
                }
            }
            Some("date") => {
                let text = field.text().await?;
                if !text.is_empty() {
                    date = Some(text);
                }
            }
            _ => {}
        }
    }

    Ok((payload, date))
}

// Handle the file upload
async fn upload_submit(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Response {
    let (payload, date) = match read_upload_form(&mut multipart).await {
        Ok(parts) => parts,
        Err(e) => {
            warn!("Failed to read upload form: {}", e);
            let jar = flash::error(jar, "No file uploaded or file type not supported.");
            return (jar, Redirect::to("/upload")).into_response();
        }
    };

    match gallery::submit(&state.db, &state.store, &user.id, payload, date).await {
        Ok(_) => {
            let jar = flash::success(jar, "Photo uploaded successfully");
            (jar, Redirect::to("/")).into_response()
        }
        Err(e) => {
            warn!(user_id = %user.id, "Upload rejected: {}", e);
            let message = match &e {
                GalleryError::Database(_) | GalleryError::Store(StoreError::Io(_)) => {
                    "Error uploading photo".to_string()
                }
                recoverable => recoverable.to_string(),
            };
            let jar = flash::error(jar, &message);
            (jar, Redirect::to("/upload")).into_response()
        }
    }
}

// Delete a photo (owner only; checked by the coordinator)
async fn delete_photo(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Response {
    let jar = match gallery::remove(&state.db, &state.store, &user.id, &id).await {
        Ok(()) => flash::success(jar, "Photo deleted successfully"),
        Err(GalleryError::NotFound) => flash::error(jar, "Photo not found"),
        Err(GalleryError::NotAuthorized) => flash::error(jar, "Not authorized"),
        Err(e) => {
            error!("Error deleting photo: {}", e);
            flash::error(jar, "Error deleting photo")
        }
    };
    (jar, Redirect::to("/")).into_response()
}

// Login page (guests only)
async fn login_form(MaybeUser(user): MaybeUser, jar: CookieJar) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    let (jar, notice) = flash::take(jar);
    let (notice_kind, notice) = notice_fields(notice);
    let template = LoginTemplate { notice_kind, notice };
    (jar, render_template(template)).into_response()
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login_submit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    if form.username.is_empty() || form.password.is_empty() {
        let jar = flash::error(jar, "Please provide both username and password");
        return (jar, Redirect::to("/users/login")).into_response();
    }

    let user = match auth::verify_credentials(&state.db, &form.username, &form.password).await {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => {
            let jar = flash::error(jar, "Invalid username or password");
            return (jar, Redirect::to("/users/login")).into_response();
        }
        Err(e) => {
            error!("Login failed: {}", e);
            let jar = flash::error(jar, "Server error occurred");
            return (jar, Redirect::to("/users/login")).into_response();
        }
    };

    match auth::create_session(&state.db, &user, state.config.auth.session_ttl_secs).await {
        Ok(token) => {
            let jar = jar.add(
                Cookie::build((auth::SESSION_COOKIE, token))
                    .path("/")
                    .http_only(true)
                    .same_site(SameSite::Lax)
                    .build(),
            );
            let jar = flash::success(jar, "You are now logged in");
            (jar, Redirect::to("/")).into_response()
        }
        Err(e) => {
            error!("Failed to create session: {}", e);
            let jar = flash::error(jar, "Server error occurred");
            (jar, Redirect::to("/users/login")).into_response()
        }
    }
}

// Registration page (guests only)
async fn register_form(MaybeUser(user): MaybeUser, jar: CookieJar) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    let (jar, notice) = flash::take(jar);
    let (notice_kind, notice) = notice_fields(notice);
    let template = RegisterTemplate { notice_kind, notice };
    (jar, render_template(template)).into_response()
}

#[derive(Deserialize)]
struct RegisterForm {
    username: String,
    password: String,
    confirm_password: String,
}

async fn register_submit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Response {
    if form.username.is_empty() || form.password.is_empty() || form.confirm_password.is_empty() {
        let jar = flash::error(jar, "Please fill in all fields");
        return (jar, Redirect::to("/users/register")).into_response();
    }
    if form.password != form.confirm_password {
        let jar = flash::error(jar, "Passwords do not match");
        return (jar, Redirect::to("/users/register")).into_response();
    }

    match auth::create_user(&state.db, &form.username, &form.password).await {
        Ok(_) => {
            let jar = flash::success(jar, "Registration successful, you can now log in");
            (jar, Redirect::to("/users/login")).into_response()
        }
        Err(AuthError::DuplicateUsername) => {
            let jar = flash::error(jar, "Username already exists");
            (jar, Redirect::to("/users/register")).into_response()
        }
        Err(e) => {
            error!("Registration failed: {}", e);
            let jar = flash::error(jar, "Server error occurred");
            (jar, Redirect::to("/users/register")).into_response()
        }
    }
}

// Logout - destroy the session and clear the cookie
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(auth::SESSION_COOKIE) {
        if let Err(e) = auth::destroy_session(&state.db, cookie.value()).await {
            error!("Error destroying session: {}", e);
        }
    }
    let jar = jar.remove(Cookie::build((auth::SESSION_COOKIE, "")).path("/").build());
    (jar, Redirect::to("/users/login")).into_response()
}
