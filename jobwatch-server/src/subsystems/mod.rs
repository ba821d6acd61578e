pub mod catalog;
pub mod scheduler;
