//! # Simulation Module
//!
//! Everything between a validated upload and the bytes of the simulator's
//! result file.
//!
//! - **upload**: content sniffing and staging into the uploads directory
//! - **params**: form fields to [`SimulationParams`] with the documented defaults
//! - **command**: argument vector for the external simulator
//! - **runner**: spawning, timeout, exit status and result file handling
//!
//! The simulator itself is an external program with this contract:
//!
//! ```text
//! <program> [script args] <staged_file> --inverter <int> --battery <int>
//!     --efficiency <f2> --reserve <f2> [--start <date> --end <date>]
//! ```
//!
//! It exits with 0 on success and writes its output to a fixed file in its
//! working directory.

pub mod command;
pub mod params;
pub mod runner;
pub mod upload;

pub use command::{shell_quote, SimulationCommand};
pub use params::SimulationParams;
pub use runner::{RunError, SimulationRunner};
pub use upload::{sniff_mime, stage_upload, StageError, StagedUpload, UploadedFile};
