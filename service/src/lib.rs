//! Process-level services shared by the server binary and the web layer:
//! command line / environment configuration and logger bootstrap.

pub mod config;
pub mod logging;
