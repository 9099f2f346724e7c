pub mod backend;
pub mod config;
pub mod net;
pub mod plugin;
pub mod policy;
pub mod protocol;
