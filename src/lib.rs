//! Master-side Modbus request optimization and framing core.
//!
//! Turns an address list into a minimal set of on-wire requests, and encodes/decodes
//! those requests for RTU, ASCII, and TCP. Transport-agnostic and synchronous: callers
//! supply a [`master::Transport`] implementation and drive the round trips themselves.
//!
//! # Pipeline
//!
//! ```text
//! addresses -> block::addresses_to_blocks -> merge::merge_blocks -> pack::pack_blocks
//!           -> optimizer::RequestPlan (one per on-wire transaction)
//! ```
//!
//! Each plan is encoded by [`frame::encode`], sent over a [`master::Transport`],
//! decoded by [`frame::decode`], and its PDU parsed by [`response::parse_read_response`]
//! or [`response::parse_write_response`]. [`master::MasterContext`] wires this together
//! and tracks [`master::Statistics`].
//!
//! # Features
//!
//! - `modbus-rtu`, `modbus-ascii`, `modbus-tcp` — enable each transport's codec; a
//!   disabled variant returns [`error::Error::NotSupported`] instead of failing to
//!   compile, since the three are otherwise a closed enumeration.
//! - `serde` — derives `Serialize`/`Deserialize` on [`master::MasterConfig`] and
//!   [`master::ConfigMode`] for config-file loading.
//! - `static-pool` — switches [`pdu::Pdu`] to a fixed-capacity inline buffer and changes
//!   [`pool::PoolLimits::default_pool`]'s availability, for callers who cannot allocate.
//!
//! All four are on by default except `static-pool`.

pub mod block;
pub mod checksum;
pub mod cost;
pub mod error;
pub mod frame;
pub mod master;
pub mod merge;
pub mod optimizer;
pub mod pack;
pub mod pdu;
pub mod policy;
pub mod pool;
pub mod response;

pub use block::Block;
pub use cost::CostParams;
pub use error::{Error, Result};
pub use frame::{DecodedFrame, TransportMode};
pub use master::{ConfigMode, MasterConfig, MasterContext, ReadResult, Statistics, Transport};
pub use optimizer::RequestPlan;
pub use pdu::{Pdu, PduBuilder};
pub use policy::{FcPolicyEntry, UnitKind};
pub use pool::PoolLimits;
pub use response::{ReadData, WriteExpectation};
