//! Resumable development environment bootstrapper.
//!
//! Installs a fixed catalogue of tools in ordered phases and deploys
//! configuration files, recording progress in a state document so that runs
//! are idempotent and resume after interruption.
//!
//! The public API is organised into layers:
//!
//! - **[`state`]**: the persisted state document and its atomic store
//! - **[`packages`]**: one contract over apt, dnf, pacman and brew
//! - **[`pipeline`]**: version resolution, checksum verification, download,
//!   extraction and install of release binaries
//! - **[`units`]** and **[`scheduler`]**: the phase catalogue and its runner
//! - **[`commands`]**: `install`, `doctor`, `status`, `update`, `version`
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod checksum;
pub mod cli;
pub mod commands;
pub mod error;
pub mod exec;
pub mod http;
pub mod logging;
pub mod packages;
pub mod pipeline;
pub mod platform;
pub mod prompt;
pub mod scheduler;
pub mod settings;
pub mod state;
pub mod units;
pub mod version;
