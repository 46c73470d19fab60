//! Tests against a real Postgres database. Run with
//! `DATABASE_URL=postgres://... cargo test -- --ignored`.

use rand::{distributions::Alphanumeric, Rng};
use serde_json::json;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use warp::{http::StatusCode, test::request};

use foodgram::{
    actions::{
        add_recipe_relation, create_recipe, delete_recipe, export_shopping_list,
        fetch_subscriptions, get_recipe, get_recipe_read, list_ingredients, list_tags,
        login_user, register_user, remove_recipe_relation, subscribe, update_recipe,
        RecipeRelation,
    },
    api::routes,
    config::Config,
    connection::migrate,
    pagination::PageParams,
    schema::{Id, User},
    seed::{load_ingredients, load_tags, IngredientSeed, TagSeed},
    state::State,
    validation::{Credentials, IngredientAmount, NewRecipe, NewUser, RecipeUpdate},
};

struct Fixture {
    pool: Pool<Postgres>,
    suffix: String,
}

impl Fixture {
    async fn new() -> Self {
        let url = std::env::var("DATABASE_URL").unwrap();
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .unwrap();
        migrate(&pool).await.unwrap();

        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(10)
            .map(char::from)
            .collect::<String>()
            .to_lowercase();

        Self { pool, suffix }
    }

    async fn user(&self, name: &str) -> User {
        register_user(
            &NewUser {
                email: format!("{name}.{}@example.com", self.suffix),
                username: format!("{name}_{}", self.suffix),
                first_name: String::from("Test"),
                last_name: String::from("Cook"),
                password: String::from("salted-caramel"),
            },
            &self.pool,
        )
        .await
        .unwrap()
    }

    async fn ingredient(&self, name: &str, unit: &str) -> Id {
        let name = format!("{name} {}", self.suffix);
        load_ingredients(
            &[IngredientSeed {
                name: name.clone(),
                measurement_unit: unit.to_owned(),
            }],
            &self.pool,
        )
        .await
        .unwrap();

        list_ingredients(Some(&name), &self.pool)
            .await
            .unwrap()
            .into_iter()
            .find(|ingredient| ingredient.name == name && ingredient.measurement_unit == unit)
            .unwrap()
            .id
    }

    async fn tag(&self, slug: &str) -> Id {
        let slug = format!("{slug}-{}", self.suffix);
        load_tags(
            &[TagSeed {
                name: slug.clone(),
                color: String::from("#E26C2D"),
                slug: slug.clone(),
            }],
            &self.pool,
        )
        .await
        .unwrap();

        list_tags(&self.pool)
            .await
            .unwrap()
            .into_iter()
            .find(|tag| tag.slug == slug)
            .unwrap()
            .id
    }

    async fn recipe(&self, author: &User, ingredients: &[(Id, i32)], tag: Id) -> Id {
        create_recipe(
            author.id,
            &NewRecipe {
                name: format!("Recipe {}", self.suffix),
                text: String::from("Cook it."),
                cooking_time: 15,
                image: String::from("data:image/png;base64,iVBORw0KGgo="),
                ingredients: ingredients
                    .iter()
                    .map(|(id, amount)| IngredientAmount {
                        id: *id,
                        amount: *amount,
                    })
                    .collect(),
                tags: vec![tag],
            },
            &self.pool,
        )
        .await
        .unwrap()
    }
}

#[tokio::test]
#[ignore]
async fn nonexistent_tag_is_rejected() {
    let fixture = Fixture::new().await;
    let author = fixture.user("tagless").await;
    let flour = fixture.ingredient("flour", "g").await;

    let error = create_recipe(
        author.id,
        &NewRecipe {
            name: String::from("Bread"),
            text: String::from("Knead."),
            cooking_time: 60,
            image: String::from("data:image/png;base64,iVBORw0KGgo="),
            ingredients: vec![IngredientAmount {
                id: flour,
                amount: 500,
            }],
            tags: vec![i32::MAX],
        },
        &fixture.pool,
    )
    .await
    .unwrap_err();

    assert_eq!(error.code, 400);
    assert_eq!(
        error.body(),
        json!({"tags": [format!("Tag {} does not exist.", i32::MAX)]})
    );
}

#[tokio::test]
#[ignore]
async fn favorite_toggle_round_trip() {
    let fixture = Fixture::new().await;
    let author = fixture.user("favorite").await;
    let eggs = fixture.ingredient("eggs", "pcs").await;
    let tag = fixture.tag("breakfast").await;
    let recipe = fixture.recipe(&author, &[(eggs, 3)], tag).await;

    let relation = RecipeRelation::Favorites;
    add_recipe_relation(relation, author.id, recipe, &fixture.pool)
        .await
        .unwrap();
    let error = add_recipe_relation(relation, author.id, recipe, &fixture.pool)
        .await
        .unwrap_err();
    assert_eq!(error.body(), json!({"errors": "Recipe is already in favorites"}));

    let read = get_recipe_read(recipe, Some(author.id), &fixture.pool)
        .await
        .unwrap()
        .unwrap();
    assert!(read.is_favorited);
    assert!(!read.is_in_shopping_cart);

    remove_recipe_relation(relation, author.id, recipe, &fixture.pool)
        .await
        .unwrap();
    let error = remove_recipe_relation(relation, author.id, recipe, &fixture.pool)
        .await
        .unwrap_err();
    assert_eq!(error.body(), json!({"errors": "Recipe is not in favorites"}));
}

#[tokio::test]
#[ignore]
async fn shopping_list_sums_only_own_cart() {
    let fixture = Fixture::new().await;
    let alice = fixture.user("alice").await;
    let bob = fixture.user("bob").await;
    let sugar = fixture.ingredient("sugar", "g").await;
    let milk = fixture.ingredient("milk", "ml").await;
    let tag = fixture.tag("dessert").await;

    let pudding = fixture.recipe(&alice, &[(sugar, 100), (milk, 500)], tag).await;
    let cake = fixture.recipe(&alice, &[(sugar, 250)], tag).await;

    let cart = RecipeRelation::ShoppingCart;
    add_recipe_relation(cart, alice.id, pudding, &fixture.pool).await.unwrap();
    add_recipe_relation(cart, alice.id, cake, &fixture.pool).await.unwrap();
    add_recipe_relation(cart, bob.id, cake, &fixture.pool).await.unwrap();

    let sugar_name = format!("sugar {}", fixture.suffix);
    let milk_name = format!("milk {}", fixture.suffix);

    let list = export_shopping_list(alice.id, &fixture.pool).await.unwrap();
    assert_eq!(list.total(&sugar_name, "g"), Some(350));
    assert_eq!(list.total(&milk_name, "ml"), Some(500));

    let list = export_shopping_list(bob.id, &fixture.pool).await.unwrap();
    assert_eq!(list.total(&sugar_name, "g"), Some(250));
    assert_eq!(list.total(&milk_name, "ml"), None);
}

async fn relation_rows(fixture: &Fixture, table: &str, recipe: Id) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE recipe_id = $1"))
        .bind(recipe)
        .fetch_one(&fixture.pool)
        .await
        .unwrap()
}

#[tokio::test]
#[ignore]
async fn update_replaces_joins_and_delete_cascades() {
    let fixture = Fixture::new().await;
    let author = fixture.user("lifecycle").await;
    let oats = fixture.ingredient("oats", "g").await;
    let honey = fixture.ingredient("honey", "tbsp").await;
    let berries = fixture.ingredient("berries", "g").await;
    let breakfast = fixture.tag("morning").await;
    let snack = fixture.tag("snack").await;
    let recipe = fixture
        .recipe(&author, &[(oats, 80), (honey, 2)], breakfast)
        .await;
    let created = get_recipe(recipe, &fixture.pool).await.unwrap().unwrap();

    update_recipe(
        recipe,
        &RecipeUpdate {
            name: Some(String::from("Berry bowl")),
            text: None,
            cooking_time: None,
            image: None,
            ingredients: vec![IngredientAmount {
                id: berries,
                amount: 120,
            }],
            tags: vec![snack],
        },
        &fixture.pool,
    )
    .await
    .unwrap();

    let read = get_recipe_read(recipe, Some(author.id), &fixture.pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(read.name, "Berry bowl");
    assert_eq!(read.text, "Cook it.");
    assert_eq!(
        read.ingredients
            .iter()
            .map(|ingredient| (ingredient.id, ingredient.amount))
            .collect::<Vec<_>>(),
        vec![(berries, 120)]
    );
    assert_eq!(
        read.tags.iter().map(|tag| tag.id).collect::<Vec<_>>(),
        vec![snack]
    );
    let updated = get_recipe(recipe, &fixture.pool).await.unwrap().unwrap();
    assert!(updated.updated_at > created.updated_at);

    add_recipe_relation(RecipeRelation::Favorites, author.id, recipe, &fixture.pool)
        .await
        .unwrap();
    add_recipe_relation(RecipeRelation::ShoppingCart, author.id, recipe, &fixture.pool)
        .await
        .unwrap();
    let berries_name = format!("berries {}", fixture.suffix);
    let list = export_shopping_list(author.id, &fixture.pool).await.unwrap();
    assert_eq!(list.total(&berries_name, "g"), Some(120));

    delete_recipe(recipe, &fixture.pool).await.unwrap();

    assert!(get_recipe(recipe, &fixture.pool).await.unwrap().is_none());
    let list = export_shopping_list(author.id, &fixture.pool).await.unwrap();
    assert_eq!(list.total(&berries_name, "g"), None);
    for table in ["favorites", "shopping_cart", "recipe_ingredients", "recipe_tags"] {
        assert_eq!(relation_rows(&fixture, table, recipe).await, 0, "{table}");
    }
}

#[tokio::test]
#[ignore]
async fn relation_to_missing_recipe_is_not_found() {
    let fixture = Fixture::new().await;
    let user = fixture.user("dangling").await;

    let error = add_recipe_relation(RecipeRelation::ShoppingCart, user.id, i32::MAX, &fixture.pool)
        .await
        .unwrap_err();
    assert_eq!(error.code, 404);
}

#[tokio::test]
#[ignore]
async fn subscriptions_list_recipe_previews() {
    let fixture = Fixture::new().await;
    let reader = fixture.user("reader").await;
    let author = fixture.user("author").await;
    let salt = fixture.ingredient("salt", "g").await;
    let tag = fixture.tag("supper").await;
    fixture.recipe(&author, &[(salt, 1)], tag).await;
    fixture.recipe(&author, &[(salt, 2)], tag).await;

    subscribe(reader.id, author.id, &fixture.pool).await.unwrap();
    let error = subscribe(reader.id, author.id, &fixture.pool)
        .await
        .unwrap_err();
    assert_eq!(error.code, 400);

    let params = PageParams {
        page: 1,
        page_size: 6,
    };
    let (subscriptions, total) = fetch_subscriptions(reader.id, Some(1), &params, &fixture.pool)
        .await
        .unwrap();

    assert_eq!(total, 1);
    assert_eq!(subscriptions[0].user.id, author.id);
    assert!(subscriptions[0].user.is_subscribed);
    assert_eq!(subscriptions[0].recipes.len(), 1);
    assert_eq!(subscriptions[0].recipes_count, 2);
}

#[tokio::test]
#[ignore]
async fn only_the_author_may_edit() {
    let fixture = Fixture::new().await;
    let author = fixture.user("owner").await;
    let stranger = fixture.user("stranger").await;
    let rice = fixture.ingredient("rice", "g").await;
    let tag = fixture.tag("lunch").await;
    let recipe = fixture.recipe(&author, &[(rice, 150)], tag).await;

    let config = Config::from_lookup(|key| match key {
        "DATABASE_URL" => std::env::var("DATABASE_URL").ok(),
        "FOODGRAM_SECRET_KEY" => Some(String::from("database-test-secret")),
        _ => None,
    })
    .unwrap();
    let state = State::new(fixture.pool.clone(), config).unwrap();

    let token = login_user(
        &Credentials {
            email: format!("stranger.{}@example.com", fixture.suffix),
            password: String::from("salted-caramel"),
        },
        &state.session_key,
        &fixture.pool,
    )
    .await
    .unwrap();

    let response = request()
        .method("PATCH")
        .path(&format!("/api/recipes/{recipe}/"))
        .header("authorization", format!("Token {token}"))
        .json(&json!({"ingredients": [{"id": rice, "amount": 1}], "tags": [tag]}))
        .reply(&routes(state.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = request()
        .method("DELETE")
        .path(&format!("/api/recipes/{recipe}/"))
        .header("authorization", format!("Token {token}"))
        .reply(&routes(state))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_ne!(stranger.id, author.id);
}
