use foodgram::{
    config::Config,
    connection::{connect, migrate},
    server::{init_logging, serve},
    state::State,
};

type Error = Box<dyn std::error::Error + Send + Sync + 'static>;
type Result<T> = std::result::Result<T, Error>;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = Config::load()?;
    let pool = connect(&config).await?;
    migrate(&pool).await?;

    let state = State::new(pool, config)?;
    serve(state).await?;
    Ok(())
}
