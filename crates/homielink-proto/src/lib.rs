//! # homielink-proto
//!
//! Wire contract for the Homie convention: the topic grammar and the
//! message value objects exchanged with the transport.
//!
//! ## Topics
//!
//! All topics of one device live under `<base_topic><device_id>/`:
//!
//! - `<base><dev>/$...` — device metadata
//! - `<base><dev>/<node>[_<index>]/<property>[/...]` — values and metadata
//! - `<base><dev>/<node>[_<index>]/<property>/set` — inbound writes
//! - `<base>$broadcast/<level>` — device-independent broadcasts
//!
//! [`TopicScheme`] builds outbound topics and classifies inbound ones.
//! Classification is deliberately tolerant: anything that does not match the
//! grammar is `None`, never an error, matching the convention's tolerance
//! for stray traffic.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod message;
pub mod topics;

pub use message::{Message, QoS};
pub use topics::{split_node_token, Inbound, TopicScheme, CONVENTION_VERSION, DEFAULT_BASE_TOPIC};
