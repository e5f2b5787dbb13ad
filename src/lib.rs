mod database {
    pub mod actions;
    pub mod error;
    pub mod memory;
    pub mod pagination;
    pub mod postgres;
    pub mod schema;
    pub mod store;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
pub mod services {
    pub mod composer;
    pub mod filters;
    pub mod images;
    pub mod relations;
    pub mod shopping_list;

    #[cfg(test)]
    pub mod fixtures;
}
pub mod api {
    pub mod context;
    pub mod handlers;
    pub mod models;
    pub mod rejection;
    pub mod routes;
}
mod config;
mod constants;

pub use authentication::*;
pub use config::*;
pub use constants::*;
pub use database::*;
