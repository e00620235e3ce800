pub mod cli;
pub mod config;
pub mod grid_dump;
pub mod loader;
pub mod model;
pub mod sim;
pub mod spec;
pub mod validate;

pub use cli::run;
pub use config::SimulatorConfig;
pub use loader::{load, load_json, load_yaml, LoadOutput};
pub use sim::SystemSimulator;
pub use validate::ValidationError;
