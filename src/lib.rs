//! boxen configuration resolution
//!
//! This crate turns a project's layered boxen configuration into a complete
//! CloudFormation template, and hands that template to build and deploy
//! collaborators.

pub mod cli;
pub mod config;
pub mod context;
pub mod deploy;
pub mod document;
pub mod error;
pub mod logging;
pub mod options;
pub mod providers;
pub mod template;
