pub mod import;
mod models;
pub mod routes;

pub use import::ImportReport;
pub use models::*;
