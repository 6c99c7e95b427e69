pub mod config_resolver;
pub mod generate;
pub mod jobs;
pub mod providers;
pub mod queue;
pub mod registry;
pub mod status;
pub mod store;
pub mod worker;
