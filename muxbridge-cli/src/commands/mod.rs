pub mod config;
pub mod serve;
pub mod servers;
pub mod sessions;
