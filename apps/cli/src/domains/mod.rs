pub mod config;
pub mod projects;
pub mod run;
