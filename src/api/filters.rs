use std::convert::Infallible;

use serde_json::Value;
use warp::{reject::Rejection, Filter};

use crate::{
    constants::MAX_BODY_BYTES,
    form::QueryParams,
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    state::SharedState,
};

pub fn with_state(
    state: SharedState,
) -> impl Filter<Extract = (SharedState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// The decoded query string, empty when the request has none.
pub fn with_query() -> impl Filter<Extract = (QueryParams,), Error = Infallible> + Clone {
    warp::query::raw()
        .or(warp::any().map(String::new))
        .unify()
        .map(|raw: String| QueryParams::parse(&raw))
}

pub fn session(
    state: &SharedState,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    with_session(state.session_key.clone())
}

pub fn possible_session(
    state: &SharedState,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    with_possible_session(state.session_key.clone())
}

/// A JSON body of at most `MAX_BODY_BYTES`.
pub fn json_body() -> impl Filter<Extract = (Value,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}
