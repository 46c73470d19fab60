//! HTTP surface. Every resource contributes one boxed filter; rejections from
//! all of them end up in [`recover::handle_rejection`].

use std::convert::Infallible;

use warp::{reply::Reply, Filter};

use crate::state::SharedState;

pub mod auth;
pub mod catalog;
pub mod filters;
pub mod recipes;
pub mod recover;
pub mod users;

pub fn routes(
    state: SharedState,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    catalog::routes(state.clone())
        .or(recipes::routes(state.clone()))
        .unify()
        .or(users::routes(state.clone()))
        .unify()
        .or(auth::routes(state))
        .unify()
        .recover(recover::handle_rejection)
        .unify()
        .with(warp::log("foodgram::api"))
}
