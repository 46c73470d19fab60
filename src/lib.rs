mod database {
    pub mod actions;
    pub mod connection;
    pub mod error;
    pub mod form;
    pub mod pagination;
    pub mod schema;
    pub mod seed;
    pub mod shopping_list;
    pub mod validation;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
pub mod api;
pub mod config;
mod constants;
pub mod server;
pub mod state;

pub use authentication::*;
pub use constants::*;
pub use database::*;
