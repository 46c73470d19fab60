use sqlx::{Pool, Postgres};

use crate::{
    error::{Error, QueryError},
    schema::{CartRow, Id},
    shopping_list::ShoppingList,
};

/// Ingredient totals over the recipes in `user_id`'s own cart, one row per
/// (name, unit).
pub async fn list_cart_rows(user_id: Id, pool: &Pool<Postgres>) -> Result<Vec<CartRow>, Error> {
    let rows: Vec<CartRow> = sqlx::query_as(
        "
        SELECT i.name, i.measurement_unit, SUM(ri.amount)::BIGINT AS total
        FROM shopping_cart c
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = $1
        GROUP BY i.name, i.measurement_unit
        ORDER BY i.name, i.measurement_unit
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn export_shopping_list(user_id: Id, pool: &Pool<Postgres>) -> Result<ShoppingList, Error> {
    let rows = list_cart_rows(user_id, pool).await?;
    let list = ShoppingList::from_rows(rows);

    log::debug!("Shopping list for user {user_id} has {} lines", list.len());
    Ok(list)
}
