pub mod analytics;
pub mod grading;
