pub mod analyze;
pub mod estimate;
pub mod history;
pub mod run;
pub mod schema;
pub mod summary;
