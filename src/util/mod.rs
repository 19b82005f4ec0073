pub mod names;
pub mod telemetry;
