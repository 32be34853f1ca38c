//! Command-line front end over the scan lifecycle

pub mod commands;
pub mod display;
