pub mod config_io;
pub mod launcher;
pub mod store;
