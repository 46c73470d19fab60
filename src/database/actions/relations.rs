use sqlx::{Pool, Postgres};

use crate::{
    error::{Error, HtmlError, QueryError},
    schema::Id,
};

/// Per-user recipe relations toggled through POST / DELETE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeRelation {
    Favorites,
    ShoppingCart,
}

impl RecipeRelation {
    fn table(self) -> &'static str {
        match self {
            RecipeRelation::Favorites => "favorites",
            RecipeRelation::ShoppingCart => "shopping_cart",
        }
    }

    fn already_added(self) -> Error {
        let info = match self {
            RecipeRelation::Favorites => "Recipe is already in favorites",
            RecipeRelation::ShoppingCart => "Recipe is already in the shopping cart",
        };
        HtmlError::InvalidRequest.new(info).keyed("errors")
    }

    fn not_added(self) -> Error {
        let info = match self {
            RecipeRelation::Favorites => "Recipe is not in favorites",
            RecipeRelation::ShoppingCart => "Recipe is not in the shopping cart",
        };
        HtmlError::InvalidRequest.new(info).keyed("errors")
    }
}

pub async fn add_recipe_relation(
    relation: RecipeRelation,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let result = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        relation.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(relation.already_added());
    }
    Ok(())
}

pub async fn remove_recipe_relation(
    relation: RecipeRelation,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        relation.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(relation.not_added());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn toggle_errors_use_errors_key() {
        assert_eq!(
            RecipeRelation::Favorites.already_added().body(),
            json!({"errors": "Recipe is already in favorites"})
        );
        assert_eq!(
            RecipeRelation::ShoppingCart.not_added().body(),
            json!({"errors": "Recipe is not in the shopping cart"})
        );
        assert_eq!(RecipeRelation::Favorites.not_added().code, 400);
    }
}
