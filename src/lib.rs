pub mod config;
pub mod desk;
pub mod import;
pub mod listing;
pub mod output;
pub mod race;
pub mod server;
pub mod session;
pub mod store;
