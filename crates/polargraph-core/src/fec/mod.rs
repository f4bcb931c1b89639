//! Polar Code Construction Blocks
//!
//! - [`BmsChannel`] - binary memoryless symmetric channels with degrading merge
//! - [`FrozenBitSelector`] - bit-channel error probabilities and frozen sets
//! - [`PolarFactorGraph`] - butterfly factor graph and its sparsification
//! - [`PolarCode`] - encoder, generator/parity-check matrices, cached graph
//!
//! ## Usage
//!
//! ```rust
//! use polargraph_core::fec::{compute_frozen_indices, BmsChannel, PolarCode};
//!
//! let channel = BmsChannel::bsc(0.1).unwrap();
//! let frozen = compute_frozen_indices(&channel, 3, 4, Some(0.1), None).unwrap();
//!
//! let mut code = PolarCode::new(3, frozen).unwrap();
//! let stats = code.factor_graph_mut().unwrap().sparsify().unwrap();
//! assert!(stats.checks_after < stats.checks_before);
//! ```

pub mod bms_channel;
pub mod frozen_bits;
pub mod polar;
pub mod polar_graph;

pub use bms_channel::BmsChannel;
pub use frozen_bits::{compute_frozen_indices, select_frozen, FrozenBitSelector, FrozenCriterion};
pub use polar::{polar_transform, PolarCode};
pub use polar_graph::{PolarFactorGraph, SparsifyStats, ZStructure, MAX_STAGES};
