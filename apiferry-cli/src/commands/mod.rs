//! CLI subcommands

pub mod serve;
pub mod version;
