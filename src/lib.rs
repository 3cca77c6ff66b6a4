pub mod client;
pub mod config;
pub mod error;
pub mod helpers;
pub mod loaders;
pub mod pokemon;
pub mod routes;
pub mod trace;

pub use client::*;
pub use config::*;
pub use error::*;
pub use pokemon::*;
pub use trace::*;
