pub mod error;
pub mod health;
pub mod tables;

pub use error::AppError;
