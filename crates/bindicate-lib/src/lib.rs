//! Bindicate — cart/shelf/bin LED indicators over Bluetooth Low Energy.

pub mod bindicators;
pub mod color;
pub mod config;
pub mod connection;
pub mod error;
pub mod firmware;
pub mod models;
pub mod protocol;
pub mod queue;
pub mod topology;

pub use error::BindicateError;
