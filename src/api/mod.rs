pub mod rest;
pub mod ws;

pub use rest::{ApiError, ApiResult, AppState, RestApi};
