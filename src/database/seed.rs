use serde::{de::DeserializeOwned, Deserialize};
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::error::{Error, QueryError, TypeError};

/// Postgres caps one statement at 65535 bind parameters.
const BIND_LIMIT: usize = 65535;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct IngredientSeed {
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TagSeed {
    pub name: String,
    pub color: String,
    pub slug: String,
}

pub fn parse_seed<T: DeserializeOwned>(data: &str) -> Result<Vec<T>, Error> {
    serde_json::from_str(data).map_err(|e| TypeError::new(&format!("Invalid seed data: {e}")).into())
}

/// Inserts the ingredients, skipping ones that already exist. Returns the
/// number of new rows.
pub async fn load_ingredients(
    ingredients: &[IngredientSeed],
    pool: &Pool<Postgres>,
) -> Result<u64, Error> {
    let mut inserted = 0;
    for chunk in ingredients.chunks(BIND_LIMIT / 2) {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO ingredients (name, measurement_unit) ");
        query_builder.push_values(chunk, |mut b, ingredient| {
            b.push_bind(&ingredient.name)
                .push_bind(&ingredient.measurement_unit);
        });
        query_builder.push(" ON CONFLICT DO NOTHING");

        let result = query_builder
            .build()
            .execute(pool)
            .await
            .map_err(QueryError::from)?;
        inserted += result.rows_affected();
    }

    log::info!("Loaded {inserted} of {} ingredients", ingredients.len());
    Ok(inserted)
}

pub async fn load_tags(tags: &[TagSeed], pool: &Pool<Postgres>) -> Result<u64, Error> {
    let mut inserted = 0;
    for chunk in tags.chunks(BIND_LIMIT / 3) {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO tags (name, color, slug) ");
        query_builder.push_values(chunk, |mut b, tag| {
            b.push_bind(&tag.name)
                .push_bind(&tag.color)
                .push_bind(&tag.slug);
        });
        query_builder.push(" ON CONFLICT DO NOTHING");

        let result = query_builder
            .build()
            .execute(pool)
            .await
            .map_err(QueryError::from)?;
        inserted += result.rows_affected();
    }

    log::info!("Loaded {inserted} of {} tags", tags.len());
    Ok(inserted)
}
