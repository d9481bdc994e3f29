#![doc = include_str!("../README.md")]
#![warn(missing_debug_implementations, missing_docs, rustdoc::all)]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

/// The JSON-RPC API exposed by the custody service.
pub mod api;

/// Telemetry and metrics utilities
pub mod telemetry;

/// Common types and utilities
pub mod common;

/// Driver for the custody service, which owns the system and serializes every call
pub mod driver;
pub use driver::CustodyDriver;

/// Configuration and command-line argument parsing
pub mod config;

/// Error taxonomy shared by every component.
pub mod error;
pub use error::CustodyError;

/// Primitive types and utilities
pub mod primitives;

/// The user-facing deposit manager, its wrapped receipt tokens and the L1 bridge model.
pub mod deposit;

/// The staking manager and its embedded strategy registry.
pub mod staking;

/// Yield strategies and the external venues they deploy capital into.
pub mod strategy;

/// Upgradeable proxies: implementations, storage versions and `upgradeToAndCall`.
pub mod upgrade;

/// The transactional executor tying every component together.
pub mod system;
pub use system::CustodySystem;

/// Bring-up sequence run by the deployment collaborator.
pub mod bootstrap;

/// Build-time information.
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Utilities for testing
#[cfg(test)]
mod test_util;

/// End-to-end scenarios over the whole system
#[cfg(test)]
mod system_test;
