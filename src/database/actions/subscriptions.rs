use std::collections::HashMap;

use sqlx::{Pool, Postgres};

use crate::{
    error::{Error, HtmlError, QueryError},
    form::QueryParams,
    pagination::PageParams,
    schema::{AuthorRecipe, Id, RecipeShort, SubscriptionRead, SubscriptionRow},
};

use super::users::get_user_by_id;

/// Reads the optional `recipes_limit` query parameter.
pub fn recipes_limit(query: &QueryParams) -> Result<Option<i64>, Error> {
    match query.get_int("recipes_limit")? {
        Some(limit) if limit < 0 => Err(Error::field(
            "recipes_limit",
            "Ensure this value is greater than or equal to 0.",
        )),
        limit => Ok(limit),
    }
}

fn reject_self(user_id: Id, author_id: Id) -> Result<(), Error> {
    if user_id == author_id {
        return Err(HtmlError::InvalidRequest
            .new("You cannot subscribe to yourself")
            .keyed("errors"));
    }
    Ok(())
}

async fn require_author(author_id: Id, pool: &Pool<Postgres>) -> Result<(), Error> {
    get_user_by_id(author_id, pool)
        .await?
        .map(|_| ())
        .ok_or_else(|| HtmlError::NotFound.default())
}

/// Self-subscription fails before the database is touched.
pub async fn subscribe(user_id: Id, author_id: Id, pool: &Pool<Postgres>) -> Result<(), Error> {
    reject_self(user_id, author_id)?;
    require_author(author_id, pool).await?;

    let result = sqlx::query(
        "INSERT INTO subscriptions (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest
            .new("You are already subscribed to this user")
            .keyed("errors"));
    }
    log::info!("User {user_id} subscribed to {author_id}");
    Ok(())
}

pub async fn unsubscribe(user_id: Id, author_id: Id, pool: &Pool<Postgres>) -> Result<(), Error> {
    reject_self(user_id, author_id)?;
    require_author(author_id, pool).await?;

    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest
            .new("You are not subscribed to this user")
            .keyed("errors"));
    }
    Ok(())
}

/// Newest recipes of each author, at most `limit` per author.
pub async fn list_author_recipes(
    author_ids: &[Id],
    limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<HashMap<Id, Vec<RecipeShort>>, Error> {
    if author_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<AuthorRecipe> = sqlx::query_as(
        "
        SELECT author_id, id, name, image, cooking_time
        FROM (
            SELECT r.author_id, r.id, r.name, r.image, r.cooking_time,
                   ROW_NUMBER() OVER (PARTITION BY r.author_id ORDER BY r.created_at DESC, r.id DESC) AS position
            FROM recipes r
            WHERE r.author_id = ANY($1)
        ) ranked
        WHERE $2::BIGINT IS NULL OR position <= $2
        ORDER BY author_id, position
    ",
    )
    .bind(author_ids)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut recipes: HashMap<Id, Vec<RecipeShort>> = HashMap::new();
    for row in rows {
        recipes.entry(row.author_id).or_default().push(row.recipe);
    }
    Ok(recipes)
}

async fn attach_recipes(
    rows: Vec<SubscriptionRow>,
    limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Vec<SubscriptionRead>, Error> {
    let author_ids: Vec<Id> = rows.iter().map(|row| row.user.id).collect();
    let mut recipes = list_author_recipes(&author_ids, limit, pool).await?;

    Ok(rows
        .into_iter()
        .map(|row| SubscriptionRead {
            recipes: recipes.remove(&row.user.id).unwrap_or_default(),
            recipes_count: row.recipes_count,
            user: row.user,
        })
        .collect())
}

/// One page of the authors `user_id` follows, ordered by username.
pub async fn fetch_subscriptions(
    user_id: Id,
    limit: Option<i64>,
    params: &PageParams,
    pool: &Pool<Postgres>,
) -> Result<(Vec<SubscriptionRead>, i64), Error> {
    let rows: Vec<SubscriptionRow> = sqlx::query_as(
        "
        SELECT u.email, u.id, u.username, u.first_name, u.last_name,
               TRUE AS is_subscribed,
               (SELECT COUNT(*) FROM recipes r WHERE r.author_id = u.id) AS recipes_count,
               COUNT(*) OVER() AS count
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY u.username, u.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let subscriptions = attach_recipes(rows, limit, pool).await?;
    Ok((subscriptions, total_count))
}

/// `author_id` as seen from `user_id`'s subscription list.
pub async fn get_subscription_read(
    user_id: Id,
    author_id: Id,
    limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Option<SubscriptionRead>, Error> {
    let row: Option<SubscriptionRow> = sqlx::query_as(
        "
        SELECT u.email, u.id, u.username, u.first_name, u.last_name,
               EXISTS(SELECT 1 FROM subscriptions s WHERE s.user_id = $1 AND s.author_id = u.id) AS is_subscribed,
               (SELECT COUNT(*) FROM recipes r WHERE r.author_id = u.id) AS recipes_count,
               1::BIGINT AS count
        FROM users u
        WHERE u.id = $2
    ",
    )
    .bind(user_id)
    .bind(author_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    let Some(row) = row else {
        return Ok(None);
    };
    Ok(attach_recipes(vec![row], limit, pool).await?.pop())
}
