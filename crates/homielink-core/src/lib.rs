//! # homielink-core
//!
//! Device-tree data model for the Homie convention.
//!
//! This crate provides:
//! - The device lifecycle state machine states ([`DeviceState`])
//! - Capability traits for the three tree levels ([`Device`], [`Node`],
//!   [`Property`]), so storage can be swapped without touching the
//!   protocol engine
//! - In-memory containers ([`SimpleDevice`], [`SimpleNode`],
//!   [`SimpleProperty`]) backed by ordered maps
//!
//! Entities never hold references to their parents. Resolution always goes
//! top-down through id lookups that return `Option`, so a missing owner
//! degrades to "not found" instead of a dangling reference.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod device;
pub mod node;
pub mod property;
pub mod state;

pub use device::{Device, SimpleDevice};
pub use node::{Node, SimpleNode};
pub use property::{Property, SimpleProperty};
pub use state::{DeviceState, UnknownStateError};
