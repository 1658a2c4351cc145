pub mod migration;
pub mod registry;
pub mod types;
