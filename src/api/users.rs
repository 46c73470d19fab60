use serde_json::{json, Value};
use warp::{
    filters::BoxedFilter,
    http::StatusCode,
    reject::Rejection,
    reply::{Reply, Response},
    Filter,
};

use crate::{
    actions::{
        fetch_subscriptions, fetch_users, get_subscription_read, get_user_read, recipes_limit,
        register_user, set_password, subscribe, unsubscribe,
    },
    constants::USER_PAGE_SIZE,
    error::HtmlError,
    form::QueryParams,
    jwt::SessionData,
    pagination::{Page, PageParams},
    permissions::ActionType,
    schema::{Id, RegisteredUser},
    state::SharedState,
    validation::{parse_password_change, parse_registration},
};

use super::filters::{json_body, possible_session, session, with_query, with_state};

const USERS_PATH: &str = "/api/users/";
const SUBSCRIPTIONS_PATH: &str = "/api/users/subscriptions/";

pub fn routes(state: SharedState) -> BoxedFilter<(Response,)> {
    let list = warp::path!("api" / "users")
        .and(warp::get())
        .and(with_query())
        .and(possible_session(&state))
        .and(with_state(state.clone()))
        .and_then(user_list);

    let register = warp::path!("api" / "users")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(user_register);

    let me = warp::path!("api" / "users" / "me")
        .and(warp::get())
        .and(session(&state))
        .and(with_state(state.clone()))
        .and_then(user_me);

    let password = warp::path!("api" / "users" / "set_password")
        .and(warp::post())
        .and(session(&state))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(user_set_password);

    let subscriptions = warp::path!("api" / "users" / "subscriptions")
        .and(warp::get())
        .and(with_query())
        .and(session(&state))
        .and(with_state(state.clone()))
        .and_then(subscription_list);

    let detail = warp::path!("api" / "users" / Id)
        .and(warp::get())
        .and(possible_session(&state))
        .and(with_state(state.clone()))
        .and_then(user_detail);

    let add_subscription = warp::path!("api" / "users" / Id / "subscribe")
        .and(warp::post())
        .and(with_query())
        .and(session(&state))
        .and(with_state(state.clone()))
        .and_then(subscription_add);

    let remove_subscription = warp::path!("api" / "users" / Id / "subscribe")
        .and(warp::delete())
        .and(session(&state))
        .and(with_state(state))
        .and_then(subscription_remove);

    list.or(register)
        .unify()
        .or(me)
        .unify()
        .or(password)
        .unify()
        .or(subscriptions)
        .unify()
        .or(detail)
        .unify()
        .or(add_subscription)
        .unify()
        .or(remove_subscription)
        .unify()
        .boxed()
}

async fn user_list(
    query: QueryParams,
    session: Option<SessionData>,
    state: SharedState,
) -> Result<Response, Rejection> {
    let params = PageParams::from_query(&query, USER_PAGE_SIZE)?;
    let viewer = session.map(|session| session.user_id);

    let (users, total) = fetch_users(viewer, &params, &state.pool).await?;
    let page = Page::from_rows(users, total, &params, USERS_PATH, &query)?;
    Ok(warp::reply::json(&page).into_response())
}

async fn user_register(body: Value, state: SharedState) -> Result<Response, Rejection> {
    let user = parse_registration(body)?;
    let user = RegisteredUser::from(register_user(&user, &state.pool).await?);

    Ok(warp::reply::with_status(warp::reply::json(&user), StatusCode::CREATED).into_response())
}

async fn user_me(session: SessionData, state: SharedState) -> Result<Response, Rejection> {
    let user = get_user_read(session.user_id, Some(session.user_id), &state.pool)
        .await?
        .ok_or_else(|| HtmlError::InvalidSession.default())?;
    Ok(warp::reply::json(&user).into_response())
}

async fn user_detail(
    id: Id,
    session: Option<SessionData>,
    state: SharedState,
) -> Result<Response, Rejection> {
    let viewer = session.map(|session| session.user_id);
    let user = get_user_read(id, viewer, &state.pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;
    Ok(warp::reply::json(&user).into_response())
}

async fn user_set_password(
    session: SessionData,
    body: Value,
    state: SharedState,
) -> Result<Response, Rejection> {
    let change = parse_password_change(body)?;
    set_password(session.user_id, &change, &state.pool).await?;

    Ok(warp::reply::json(&json!({ "status": "password set" })).into_response())
}

async fn subscription_list(
    query: QueryParams,
    session: SessionData,
    state: SharedState,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    let params = PageParams::from_query(&query, USER_PAGE_SIZE)?;
    let limit = recipes_limit(&query)?;

    let (subscriptions, total) =
        fetch_subscriptions(session.user_id, limit, &params, &state.pool).await?;
    let page = Page::from_rows(subscriptions, total, &params, SUBSCRIPTIONS_PATH, &query)?;
    Ok(warp::reply::json(&page).into_response())
}

async fn subscription_add(
    author_id: Id,
    query: QueryParams,
    session: SessionData,
    state: SharedState,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    let limit = recipes_limit(&query)?;

    subscribe(session.user_id, author_id, &state.pool).await?;
    let subscription = get_subscription_read(session.user_id, author_id, limit, &state.pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;
    Ok(
        warp::reply::with_status(warp::reply::json(&subscription), StatusCode::CREATED)
            .into_response(),
    )
}

async fn subscription_remove(
    author_id: Id,
    session: SessionData,
    state: SharedState,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    unsubscribe(session.user_id, author_id, &state.pool).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
