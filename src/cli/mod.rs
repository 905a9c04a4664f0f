//! CLI command handlers

pub mod commands;

pub use commands::{menus, schedule, status, sync, sync_consolidated, Context};
