// src/lib.rs

pub mod aggregate;
pub mod analysis;
pub mod build;
pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod process;
pub mod renderer;
pub mod reporter;
pub mod toolchain;
pub mod vcs;
pub mod version;
