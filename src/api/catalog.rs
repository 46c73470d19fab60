use warp::{
    filters::BoxedFilter,
    reject::Rejection,
    reply::{Reply, Response},
    Filter,
};

use crate::{
    actions::{get_ingredient, get_tag, list_ingredients, list_tags},
    error::HtmlError,
    form::QueryParams,
    schema::Id,
    state::SharedState,
};

use super::filters::{with_query, with_state};

pub fn routes(state: SharedState) -> BoxedFilter<(Response,)> {
    let tags = warp::path!("api" / "tags")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(tag_list);

    let tag = warp::path!("api" / "tags" / Id)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(tag_detail);

    let ingredients = warp::path!("api" / "ingredients")
        .and(warp::get())
        .and(with_query())
        .and(with_state(state.clone()))
        .and_then(ingredient_list);

    let ingredient = warp::path!("api" / "ingredients" / Id)
        .and(warp::get())
        .and(with_state(state))
        .and_then(ingredient_detail);

    tags.or(tag)
        .unify()
        .or(ingredients)
        .unify()
        .or(ingredient)
        .unify()
        .boxed()
}

async fn tag_list(state: SharedState) -> Result<Response, Rejection> {
    let tags = list_tags(&state.pool).await?;
    Ok(warp::reply::json(&tags).into_response())
}

async fn tag_detail(id: Id, state: SharedState) -> Result<Response, Rejection> {
    let tag = get_tag(id, &state.pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;
    Ok(warp::reply::json(&tag).into_response())
}

async fn ingredient_list(query: QueryParams, state: SharedState) -> Result<Response, Rejection> {
    let ingredients = list_ingredients(query.get("name"), &state.pool).await?;
    Ok(warp::reply::json(&ingredients).into_response())
}

async fn ingredient_detail(id: Id, state: SharedState) -> Result<Response, Rejection> {
    let ingredient = get_ingredient(id, &state.pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;
    Ok(warp::reply::json(&ingredient).into_response())
}
