use serde_json::{json, Value};
use warp::{
    filters::BoxedFilter,
    http::StatusCode,
    reject::Rejection,
    reply::{Reply, Response},
    Filter,
};

use crate::{actions::login_user, jwt::SessionData, state::SharedState, validation::parse_login};

use super::filters::{json_body, session, with_state};

pub fn routes(state: SharedState) -> BoxedFilter<(Response,)> {
    let login = warp::path!("api" / "auth" / "token" / "login")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(token_login);

    let logout = warp::path!("api" / "auth" / "token" / "logout")
        .and(warp::post())
        .and(session(&state))
        .and_then(token_logout);

    login.or(logout).unify().boxed()
}

async fn token_login(body: Value, state: SharedState) -> Result<Response, Rejection> {
    let credentials = parse_login(body)?;
    let token = login_user(&credentials, &state.session_key, &state.pool).await?;

    Ok(warp::reply::json(&json!({ "auth_token": token })).into_response())
}

/// Sessions are stateless; the token simply runs out.
async fn token_logout(session: SessionData) -> Result<Response, Rejection> {
    log::debug!("User {} logged out", session.user_id);
    Ok(StatusCode::NO_CONTENT.into_response())
}
