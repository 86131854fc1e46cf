pub mod app;
pub mod edit;
pub mod render;

pub use app::{AppError, run};
