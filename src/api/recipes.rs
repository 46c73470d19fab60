use serde_json::Value;
use warp::{
    filters::BoxedFilter,
    http::StatusCode,
    reject::Rejection,
    reply::{Reply, Response},
    Filter,
};

use crate::{
    actions::{
        add_recipe_relation, create_recipe, delete_recipe, export_shopping_list, fetch_recipes,
        get_recipe_mut, get_recipe_read, get_recipe_short, remove_recipe_relation, update_recipe,
        RecipeFilter, RecipeRelation,
    },
    constants::{RECIPE_PAGE_SIZE, SHOPPING_LIST_FILENAME},
    error::{Error, HtmlError},
    form::QueryParams,
    jwt::SessionData,
    pagination::{Page, PageParams},
    permissions::ActionType,
    schema::{Id, RecipeRead},
    state::SharedState,
    validation::{parse_new_recipe, parse_recipe_update},
};

use super::filters::{json_body, possible_session, session, with_query, with_state};

const RECIPES_PATH: &str = "/api/recipes/";

pub fn routes(state: SharedState) -> BoxedFilter<(Response,)> {
    let list = warp::path!("api" / "recipes")
        .and(warp::get())
        .and(with_query())
        .and(possible_session(&state))
        .and(with_state(state.clone()))
        .and_then(recipe_list);

    let create = warp::path!("api" / "recipes")
        .and(warp::post())
        .and(session(&state))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(recipe_create);

    let download = warp::path!("api" / "recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(session(&state))
        .and(with_state(state.clone()))
        .and_then(download_shopping_cart);

    let detail = warp::path!("api" / "recipes" / Id)
        .and(warp::get())
        .and(possible_session(&state))
        .and(with_state(state.clone()))
        .and_then(recipe_detail);

    let update = warp::path!("api" / "recipes" / Id)
        .and(warp::patch())
        .and(session(&state))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(recipe_update);

    let delete = warp::path!("api" / "recipes" / Id)
        .and(warp::delete())
        .and(session(&state))
        .and(with_state(state.clone()))
        .and_then(recipe_delete);

    list.or(create)
        .unify()
        .or(download)
        .unify()
        .or(detail)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(relation_routes("favorite", RecipeRelation::Favorites, state.clone()))
        .unify()
        .or(relation_routes("shopping_cart", RecipeRelation::ShoppingCart, state))
        .unify()
        .boxed()
}

fn relation_routes(
    segment: &'static str,
    relation: RecipeRelation,
    state: SharedState,
) -> BoxedFilter<(Response,)> {
    let path = warp::path!("api" / "recipes" / Id / ..)
        .and(warp::path(segment))
        .and(warp::path::end());
    let relation = warp::any().map(move || relation);

    let add = path
        .clone()
        .and(warp::post())
        .and(relation.clone())
        .and(session(&state))
        .and(with_state(state.clone()))
        .and_then(relation_add);

    let remove = path
        .and(warp::delete())
        .and(relation)
        .and(session(&state))
        .and(with_state(state))
        .and_then(relation_remove);

    add.or(remove).unify().boxed()
}

fn relation_action(relation: RecipeRelation) -> ActionType {
    match relation {
        RecipeRelation::Favorites => ActionType::ManageOwnFavorites,
        RecipeRelation::ShoppingCart => ActionType::ManageOwnShoppingCart,
    }
}

async fn recipe_list(
    query: QueryParams,
    session: Option<SessionData>,
    state: SharedState,
) -> Result<Response, Rejection> {
    let params = PageParams::from_query(&query, RECIPE_PAGE_SIZE)?;
    let filter = RecipeFilter::from_query(&query)?;
    let viewer = session.map(|session| session.user_id);

    let (recipes, total) = fetch_recipes(&filter, viewer, &params, &state.pool).await?;
    let page = Page::from_rows(recipes, total, &params, RECIPES_PATH, &query)?;
    Ok(warp::reply::json(&page).into_response())
}

async fn read_recipe(id: Id, viewer: Option<Id>, state: &SharedState) -> Result<RecipeRead, Error> {
    get_recipe_read(id, viewer, &state.pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())
}

async fn recipe_create(
    session: SessionData,
    body: Value,
    state: SharedState,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::CreateRecipes)?;
    let recipe = parse_new_recipe(body)?;

    let id = create_recipe(session.user_id, &recipe, &state.pool).await?;
    let recipe = read_recipe(id, Some(session.user_id), &state).await?;
    Ok(warp::reply::with_status(warp::reply::json(&recipe), StatusCode::CREATED).into_response())
}

async fn recipe_detail(
    id: Id,
    session: Option<SessionData>,
    state: SharedState,
) -> Result<Response, Rejection> {
    let recipe = read_recipe(id, session.map(|session| session.user_id), &state).await?;
    Ok(warp::reply::json(&recipe).into_response())
}

async fn recipe_update(
    id: Id,
    session: SessionData,
    body: Value,
    state: SharedState,
) -> Result<Response, Rejection> {
    get_recipe_mut(id, &session, &state.pool).await?;
    let update = parse_recipe_update(body)?;

    update_recipe(id, &update, &state.pool).await?;
    let recipe = read_recipe(id, Some(session.user_id), &state).await?;
    Ok(warp::reply::json(&recipe).into_response())
}

async fn recipe_delete(
    id: Id,
    session: SessionData,
    state: SharedState,
) -> Result<Response, Rejection> {
    get_recipe_mut(id, &session, &state.pool).await?;
    delete_recipe(id, &state.pool).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn relation_add(
    id: Id,
    relation: RecipeRelation,
    session: SessionData,
    state: SharedState,
) -> Result<Response, Rejection> {
    session.authenticate(relation_action(relation))?;
    let recipe = get_recipe_short(id, &state.pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    add_recipe_relation(relation, session.user_id, id, &state.pool).await?;
    Ok(warp::reply::with_status(warp::reply::json(&recipe), StatusCode::CREATED).into_response())
}

async fn relation_remove(
    id: Id,
    relation: RecipeRelation,
    session: SessionData,
    state: SharedState,
) -> Result<Response, Rejection> {
    session.authenticate(relation_action(relation))?;
    get_recipe_short(id, &state.pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    remove_recipe_relation(relation, session.user_id, id, &state.pool).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn download_shopping_cart(
    session: SessionData,
    state: SharedState,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnShoppingCart)?;
    let document = export_shopping_list(session.user_id, &state.pool)
        .await?
        .render_rtf();

    let reply = warp::reply::with_header(document, "content-type", "application/rtf");
    let reply = warp::reply::with_header(
        reply,
        "content-disposition",
        format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
    );
    Ok(reply.into_response())
}
