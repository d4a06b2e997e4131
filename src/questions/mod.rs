//! Question and category data model

mod models;

pub use models::*;
