use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::Redirect,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use cookie::time::Duration as CookieDuration;
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    session::SharedSession,
    web::{
        AppState,
        responses::{ApiError, json_error},
    },
};

pub const SESSION_COOKIE: &str = "gate_session";

const NOT_AUTHENTICATED_MESSAGE: &str = "Please log in first";

#[derive(Deserialize)]
pub struct LoginForm {
    pub password: String,
}

pub async fn process_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> (CookieJar, Redirect) {
    let (jar, session) = browser_session(&state, jar).await;
    let outcome = session.lock().await.attempt_login(&form.password);

    if outcome.is_success() {
        info!("gate opened");
    } else {
        warn!("rejected gate password");
    }

    (jar, Redirect::to("/"))
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Redirect {
    if let Some(session) = known_session(&state, &jar).await {
        session.lock().await.logout();
        info!("gate closed");
    }

    Redirect::to("/")
}

/// Session for this browser, created when it first submits a password.
pub async fn browser_session(state: &AppState, jar: CookieJar) -> (CookieJar, SharedSession) {
    let (id, session, created) = state.sessions().get_or_create(session_id(&jar)).await;
    session.lock().await.touch(Utc::now());

    if created {
        debug!("started browser session");
        let jar = jar.add(session_cookie(id, state.config().session_idle));
        (jar, session)
    } else {
        (jar, session)
    }
}

/// Session this browser already holds. Unknown or missing cookies give `None`
/// and nothing is created.
pub async fn existing_session(state: &AppState, jar: &CookieJar) -> Option<SharedSession> {
    let session = known_session(state, jar).await?;
    session.lock().await.touch(Utc::now());
    Some(session)
}

/// Session behind an open gate, or a 401 for the API caller.
pub async fn require_session(state: &AppState, jar: &CookieJar) -> Result<SharedSession, ApiError> {
    let session = known_session(state, jar).await.ok_or_else(unauthorized)?;

    {
        let mut guard = session.lock().await;
        if !guard.is_authenticated() {
            return Err(unauthorized());
        }
        guard.touch(Utc::now());
    }

    Ok(session)
}

pub fn unauthorized() -> ApiError {
    json_error(StatusCode::UNAUTHORIZED, NOT_AUTHENTICATED_MESSAGE)
}

async fn known_session(state: &AppState, jar: &CookieJar) -> Option<SharedSession> {
    let id = session_id(jar)?;
    state.sessions().get(id).await
}

fn session_id(jar: &CookieJar) -> Option<Uuid> {
    let cookie = jar.get(SESSION_COOKIE)?;
    Uuid::parse_str(cookie.value()).ok()
}

fn session_cookie(id: Uuid, idle: chrono::Duration) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, id.to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(CookieDuration::minutes(idle.num_minutes()));
    cookie
}
