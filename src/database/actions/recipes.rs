use std::collections::HashMap;

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    authentication::permissions::ActionType,
    error::{Error, FieldErrors, HtmlError, QueryError},
    form::QueryParams,
    jwt::SessionData,
    pagination::PageParams,
    schema::{Id, LinkedRecipeTag, Recipe, RecipePart, RecipeRead, RecipeRow, RecipeShort},
    validation::{IngredientAmount, NewRecipe, RecipeUpdate},
};

use super::{
    ingredients::{
        add_ingredients_to_recipe, clear_recipe_ingredients, list_recipe_parts,
        missing_ingredients,
    },
    tags::{add_tags_to_recipe, clear_recipe_tags, list_recipe_tags, missing_tags},
};

/// Recipe list filters read from the query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeFilter {
    pub author: Option<Id>,
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeFilter {
    pub fn from_query(query: &QueryParams) -> Result<Self, Error> {
        let author = query
            .get_int("author")?
            .map(|author| Id::try_from(author).map_err(|_| Error::field("author", "Invalid author id.")))
            .transpose()?;

        Ok(Self {
            author,
            tags: query
                .get_all("tags")
                .into_iter()
                .filter(|slug| !slug.is_empty())
                .map(str::to_owned)
                .collect(),
            is_favorited: query.flag("is_favorited"),
            is_in_shopping_cart: query.flag("is_in_shopping_cart"),
        })
    }

    /// Relation filters only make sense for a known requester.
    pub fn needs_viewer(&self) -> bool {
        self.is_favorited || self.is_in_shopping_cart
    }
}

fn push_recipe_select(query_builder: &mut QueryBuilder<'_, Postgres>, viewer: Option<Id>) {
    query_builder.push(
        "
        SELECT r.id, r.name, r.text, r.cooking_time, r.image,
               u.id AS author_id, u.email AS author_email, u.username AS author_username,
               u.first_name AS author_first_name, u.last_name AS author_last_name,
               EXISTS(SELECT 1 FROM subscriptions s WHERE s.author_id = u.id AND s.user_id = ",
    );
    query_builder.push_bind(viewer);
    query_builder.push(
        ") AS author_is_subscribed,
               EXISTS(SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ",
    );
    query_builder.push_bind(viewer);
    query_builder.push(
        ") AS is_favorited,
               EXISTS(SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ",
    );
    query_builder.push_bind(viewer);
    query_builder.push(
        ") AS is_in_shopping_cart,
               COUNT(*) OVER() AS count
        FROM recipes r
        INNER JOIN users u ON u.id = r.author_id
        WHERE TRUE",
    );
}

/// Attaches ingredients and tags to each row, keeping row order.
async fn assemble_recipes(
    rows: Vec<RecipeRow>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeRead>, Error> {
    let ids: Vec<Id> = rows.iter().map(|row| row.id).collect();

    let mut parts: HashMap<Id, Vec<RecipePart>> = HashMap::new();
    for part in list_recipe_parts(&ids, pool).await? {
        parts.entry(part.recipe_id).or_default().push(part);
    }
    let mut tags: HashMap<Id, Vec<LinkedRecipeTag>> = HashMap::new();
    for tag in list_recipe_tags(&ids, pool).await? {
        tags.entry(tag.recipe_id).or_default().push(tag);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let id = row.id;
            RecipeRead::assemble(
                row,
                parts.remove(&id).unwrap_or_default(),
                tags.remove(&id).unwrap_or_default(),
            )
        })
        .collect())
}

/// One page of recipes ordered by name, and the total number of matches.
pub async fn fetch_recipes(
    filter: &RecipeFilter,
    viewer: Option<Id>,
    params: &PageParams,
    pool: &Pool<Postgres>,
) -> Result<(Vec<RecipeRead>, i64), Error> {
    if filter.needs_viewer() && viewer.is_none() {
        return Ok((vec![], 0));
    }

    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new("");
    push_recipe_select(&mut query_builder, viewer);

    if let Some(author) = filter.author {
        query_builder.push(" AND r.author_id = ").push_bind(author);
    }
    if !filter.tags.is_empty() {
        query_builder
            .push(
                " AND EXISTS(SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }
    if filter.is_favorited {
        query_builder
            .push(" AND EXISTS(SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
            .push_bind(viewer)
            .push(")");
    }
    if filter.is_in_shopping_cart {
        query_builder
            .push(
                " AND EXISTS(SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ",
            )
            .push_bind(viewer)
            .push(")");
    }

    query_builder
        .push(" ORDER BY r.name, r.id LIMIT ")
        .push_bind(params.limit())
        .push(" OFFSET ")
        .push_bind(params.offset());

    let rows: Vec<RecipeRow> = query_builder
        .build_query_as::<RecipeRow>()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let recipes = assemble_recipes(rows, pool).await?;
    Ok((recipes, total_count))
}

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// The full representation of one recipe as seen by `viewer`.
pub async fn get_recipe_read(
    id: Id,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeRead>, Error> {
    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new("");
    push_recipe_select(&mut query_builder, viewer);
    query_builder.push(" AND r.id = ").push_bind(id);

    let row: Option<RecipeRow> = query_builder
        .build_query_as::<RecipeRow>()
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    let Some(row) = row else {
        return Ok(None);
    };
    Ok(assemble_recipes(vec![row], pool).await?.pop())
}

pub async fn get_recipe_short(id: Id, pool: &Pool<Postgres>) -> Result<Option<RecipeShort>, Error> {
    let row: Option<RecipeShort> =
        sqlx::query_as("SELECT id, name, image, cooking_time FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(row)
}

/// Loads a recipe the session may change: 404 when it is missing, 403 when
/// the session neither owns it nor manages all recipes.
pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, Error> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    if recipe.author_id == session.user_id {
        session.authenticate(ActionType::ManageOwnRecipes)?;
    } else {
        session.authenticate(ActionType::ManageAllRecipes)?;
    }
    Ok(recipe)
}

/// Field errors for every referenced ingredient or tag that does not exist.
async fn check_references(
    ingredients: &[IngredientAmount],
    tags: &[Id],
    conn: &mut PgConnection,
) -> Result<(), Error> {
    let mut errors = FieldErrors::new();

    let ingredient_ids: Vec<Id> = ingredients.iter().map(|ingredient| ingredient.id).collect();
    for id in missing_ingredients(&ingredient_ids, conn).await? {
        errors
            .entry(String::from("ingredients"))
            .or_default()
            .push(format!("Ingredient {id} does not exist."));
    }
    for id in missing_tags(tags, conn).await? {
        errors
            .entry(String::from("tags"))
            .or_default()
            .push(format!("Tag {id} does not exist."));
    }

    if errors.is_empty() {
        return Ok(());
    }
    Err(HtmlError::InvalidRequest.fields(errors))
}

/// Inserts the recipe and its join rows in one transaction.
pub async fn create_recipe(
    author_id: Id,
    recipe: &NewRecipe,
    pool: &Pool<Postgres>,
) -> Result<Id, Error> {
    let mut tr = pool.begin().await.map_err(QueryError::from)?;

    check_references(&recipe.ingredients, &recipe.tags, &mut tr).await?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, cooking_time, image)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&recipe.name)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .bind(&recipe.image)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    add_ingredients_to_recipe(id.0, &recipe.ingredients, &mut tr).await?;
    add_tags_to_recipe(id.0, &recipe.tags, &mut tr).await?;

    tr.commit().await.map_err(QueryError::from)?;
    log::info!("User {author_id} created recipe {}", id.0);
    Ok(id.0)
}

/// Updates the given scalar fields and replaces every join row.
pub async fn update_recipe(
    id: Id,
    update: &RecipeUpdate,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let mut tr = pool.begin().await.map_err(QueryError::from)?;

    check_references(&update.ingredients, &update.tags, &mut tr).await?;

    sqlx::query(
        "
        UPDATE recipes SET
            name = COALESCE($2, name),
            text = COALESCE($3, text),
            cooking_time = COALESCE($4, cooking_time),
            image = COALESCE($5, image),
            updated_at = NOW()
        WHERE id = $1
    ",
    )
    .bind(id)
    .bind(&update.name)
    .bind(&update.text)
    .bind(update.cooking_time)
    .bind(&update.image)
    .execute(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    clear_recipe_ingredients(id, &mut tr).await?;
    add_ingredients_to_recipe(id, &update.ingredients, &mut tr).await?;
    clear_recipe_tags(id, &mut tr).await?;
    add_tags_to_recipe(id, &update.tags, &mut tr).await?;

    tr.commit().await.map_err(QueryError::from)?;
    Ok(())
}

/// Join rows go with the recipe through `ON DELETE CASCADE`.
pub async fn delete_recipe(id: Id, pool: &Pool<Postgres>) -> Result<(), Error> {
    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    log::info!("Deleted recipe {id}");
    Ok(())
}
