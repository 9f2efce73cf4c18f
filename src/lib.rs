//! spawnargs: settings resolution front-end for a process launcher.
//!
//! Resolves named runtime settings (stream redirections and caller-defined
//! arguments) from command-line tokens and environment variables into one
//! typed table. Spawning and I/O binding happen elsewhere.

pub mod args;
pub mod config;
pub mod logging;
