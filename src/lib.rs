//! devstack-bootstrap library
//!
//! Provisions a devstack development VM for the Cue service: installs the
//! tooling, checks out devstack, mirrors local source trees into the stack
//! directory and wires up the refresh command.
//!
//! # Design Principles
//!
//! - **Idempotent**: every step checks existing state first; re-running is safe
//! - **Fail-fast**: the first failing step aborts the run, except package
//!   manager detection, which falls back from apt to yum
//! - **Immutable configuration**: options are loaded once and passed by reference

pub mod config;
pub mod layout;
pub mod packages;
pub mod provision;
pub mod render;
pub mod runner;
pub mod state;

mod error;

pub use config::BootstrapConfig;
pub use error::ProvisionError;
pub use provision::{Provisioner, RunReport, Step};
