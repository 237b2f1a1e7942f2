pub mod database;
pub mod logging;
pub mod settings;

pub use settings::{Overrides, Settings};
