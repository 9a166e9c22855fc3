//! Caller authentication

pub mod credentials;
