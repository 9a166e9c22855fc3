//! Deployment module

pub mod dispatch;
pub mod fsm;
pub mod orchestrator;
pub mod validate;
pub mod watcher;
