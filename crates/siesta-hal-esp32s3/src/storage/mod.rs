//! Flash-backed persistence for the failure log.

pub mod failure_log;
