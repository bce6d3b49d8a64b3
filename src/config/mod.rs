//! Doge model configuration.
//!
//! [`DogeParams`] is the flat, freely editable record stored in
//! `config.json`. [`DogeConfig`] is what the rest of the system consumes:
//! validated once at construction and immutable afterwards.

pub mod io;
pub mod model;
pub mod params;

pub use io::CONFIG_NAME;
pub use model::DogeConfig;
pub use params::DogeParams;
