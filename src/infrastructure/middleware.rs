// Request auth context and route guards. The auth layer resolves the session
// cookie into a `CurrentUser` request extension; the guards sit on top of it
// and turn authorization failures into redirects with a notice, never raw
// denial pages.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app_state::AppState;
use crate::error::AppError;
use crate::infrastructure::session::{self, Session};
use crate::models::user::{Role, User, UserProfile};

#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub profile: UserProfile,
}

/// Present on every request once the auth layer has run. `None` means
/// anonymous.
#[derive(Debug, Clone, Default)]
pub struct AuthContext(pub Option<CurrentUser>);

/// Resolve the session cookie into an `AuthContext` extension. An expired or
/// unknown token degrades to anonymous; an authenticated user without a
/// profile row is a data-integrity error, since registration creates the
/// profile in the same transaction as the account.
pub async fn auth_context(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| session::cookie_value(cookies, session::SESSION_COOKIE))
        .map(str::to_owned);

    let mut context = AuthContext::default();
    if let Some(token) = token {
        match resolve_user(&state, &token).await {
            Ok(current) => context = AuthContext(current),
            Err(err) => return err.into_response(),
        }
    }

    request.extensions_mut().insert(context);
    next.run(request).await
}

async fn resolve_user(state: &AppState, token: &str) -> Result<Option<CurrentUser>, AppError> {
    let Some(user_id) = Session::resolve(&state.pool, token).await? else {
        return Ok(None);
    };
    let user = match User::by_id(&state.pool, user_id).await {
        Ok(user) => user,
        // session row outliving its user is stale, not fatal
        Err(AppError::NotFound(_)) => return Ok(None),
        Err(err) => return Err(err),
    };
    let profile = UserProfile::for_user(&state.pool, user.id).await?;
    Ok(Some(CurrentUser { user, profile }))
}

/// Staff guard: anonymous callers are sent to the login page with the
/// original path as the return target; authenticated non-staff are sent back
/// to the public index with an error notice.
pub async fn require_staff(request: Request, next: Next) -> Response {
    match current_user(&request) {
        None => login_redirect(request.uri().path()),
        Some(current) if !current.user.is_staff => notice_redirect(
            "/",
            "You do not have permission to access this section.",
        ),
        Some(_) => next.run(request).await,
    }
}

/// Student guard: anonymous callers go to login; authenticated non-students
/// are denied with a notice.
pub async fn require_student(request: Request, next: Next) -> Response {
    match current_user(&request) {
        None => login_redirect(request.uri().path()),
        Some(current) if current.profile.role != Role::Student => notice_redirect(
            "/",
            "This section is only available to students.",
        ),
        Some(_) => next.run(request).await,
    }
}

fn current_user(request: &Request) -> Option<&CurrentUser> {
    request
        .extensions()
        .get::<AuthContext>()
        .and_then(|ctx| ctx.0.as_ref())
}

fn login_redirect(next_path: &str) -> Response {
    redirect_with_flash(
        &format!("/login?next={}", next_path),
        "You must sign in to access this section.",
    )
}

fn notice_redirect(location: &str, message: &str) -> Response {
    redirect_with_flash(location, message)
}

fn redirect_with_flash(location: &str, message: &str) -> Response {
    Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, location)
        .header(header::SET_COOKIE, session::flash_cookie(message))
        .body(Body::empty())
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
