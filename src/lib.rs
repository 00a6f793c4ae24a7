pub mod config;
pub mod driver;
pub mod error;
pub mod kernel;
pub mod pathway;

pub use config::EngineConfig;
pub use kernel::reactor::{Cue, Reactor};
pub use pathway::{Pathway, PathwayEvent};
