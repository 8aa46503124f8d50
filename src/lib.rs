//! HTTP gateway in front of the grid/battery simulation script.
//!
//! A client uploads a load profile CSV with a few sizing parameters; the
//! gateway stages the file, runs the external simulator and returns its
//! result file base64-encoded in a JSON envelope.

pub mod api;
pub mod config;
pub mod simulation;
pub mod telemetry;
