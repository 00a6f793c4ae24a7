pub mod dialog;
pub mod event;
pub mod intent;
pub mod presence;
pub mod reactor;
pub mod scheduler;
pub mod speech;
pub mod telemetry;
pub mod time;
