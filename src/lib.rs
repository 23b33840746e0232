pub mod api;
pub mod capture;
pub mod config;
pub mod db;
pub mod error;
pub mod messaging;
pub mod security;
pub mod services;

pub use error::Error;
