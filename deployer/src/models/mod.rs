//! Data models

pub mod deployment;
