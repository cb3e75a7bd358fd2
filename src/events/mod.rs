mod models;
mod registration;
pub mod routes;

pub use models::*;
