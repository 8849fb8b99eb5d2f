pub mod context;
pub mod finding;
