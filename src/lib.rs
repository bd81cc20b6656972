pub mod api;
pub mod clinic;
pub mod config;
pub mod database;
pub mod error;
pub mod notify;

pub use api::{router, AppState};
pub use config::Config;
pub use error::{ClinicError, ClinicResult};
