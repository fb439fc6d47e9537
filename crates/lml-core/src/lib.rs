pub mod config;
pub mod fetch;
pub mod logging;
pub mod pace;
pub mod plan;
pub mod run;
pub mod store;
pub mod task;
