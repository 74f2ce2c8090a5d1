pub mod cli;
pub mod config;
pub mod controller;
pub mod debug;
pub mod descriptor;
pub mod error;
pub mod forward;
pub mod logging;
pub mod negotiate;
pub mod signal;
pub mod store;
