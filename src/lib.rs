pub mod config;
pub mod content;
pub mod error;
pub mod modules;
pub mod services;
pub mod workflow;

pub use error::{MaintError, Result};
