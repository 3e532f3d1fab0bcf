pub mod core;
pub mod groups;
pub mod lessons;
pub mod schedule;
pub mod subjects;
