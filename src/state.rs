use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::{
    config::Config,
    error::Error,
    jwt::{session_key, SessionKey},
};

pub struct State {
    pub pool: Pool<Postgres>,
    pub config: Config,
    pub session_key: SessionKey,
}

pub type SharedState = Arc<State>;

impl State {
    pub fn new(pool: Pool<Postgres>, config: Config) -> Result<SharedState, Error> {
        let session_key = session_key(config.secret_key.as_deref())?;

        Ok(Arc::new(Self {
            pool,
            config,
            session_key,
        }))
    }
}
