use std::path::PathBuf;

use clap::Parser;
use foodgram::{
    config::Config,
    connection::{connect, migrate},
    seed::{load_ingredients, load_tags, parse_seed, IngredientSeed, TagSeed},
    server::init_logging,
};

type Error = Box<dyn std::error::Error + Send + Sync + 'static>;
type Result<T> = std::result::Result<T, Error>;

/// Loads the ingredient and tag catalogs into the database.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "data/ingredients.json")]
    ingredients: PathBuf,

    #[arg(long, default_value = "data/tags.json")]
    tags: PathBuf,

    /// Overrides DATABASE_URL.
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let mut config = match &args.database_url {
        Some(url) => Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some(url.to_owned()),
            key => std::env::var(key).ok(),
        })?,
        None => Config::load()?,
    };
    config.max_connections = config.max_connections.min(2);

    let pool = connect(&config).await?;
    migrate(&pool).await?;

    let ingredients: Vec<IngredientSeed> =
        parse_seed(&tokio::fs::read_to_string(&args.ingredients).await?)?;
    let tags: Vec<TagSeed> = parse_seed(&tokio::fs::read_to_string(&args.tags).await?)?;

    let new_ingredients = load_ingredients(&ingredients, &pool).await?;
    let new_tags = load_tags(&tags, &pool).await?;
    println!("Added {new_ingredients} ingredients and {new_tags} tags");
    Ok(())
}
