pub mod lifecycle;
mod models;
pub mod routes;

pub use lifecycle::{JoinOutcome, LeaveOutcome};
pub use models::*;
