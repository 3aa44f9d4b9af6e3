//! dbsc-server library
//!
//! Demo HTTP server composing the DBSC registration, refresh and guard steps
//! behind a placeholder login.

pub mod app;
pub mod config;
pub mod login;
