//! Deployer backend library
//!
//! Provisions new tenant instances by handing validated requests to an
//! external setup script and reporting the outcome it logs.

pub mod app;
pub mod authn;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod server;
pub mod storage;
pub mod telemetry;
pub mod utils;
