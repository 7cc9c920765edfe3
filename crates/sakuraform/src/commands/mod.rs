pub mod config;
pub mod gslb;
pub mod server;
pub mod vpc_router;
