//! Command implementations for the pixelveil CLI.

pub mod config;
pub mod inspect;
pub mod process;
