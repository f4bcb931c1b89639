//! # Polar Code Construction Library
//!
//! This crate constructs polar codes for binary memoryless symmetric (BMS)
//! channels and turns them into sparse factor graphs suitable for iterative
//! and LP-style decoding.
//!
//! ## Overview
//!
//! - **Channel degrading**: approximate every bit-channel of the polar
//!   recursion with a bounded output alphabet (Tal and Vardy)
//! - **Frozen-bit selection**: freeze the least reliable positions by error
//!   probability threshold or target rate, in parallel with `rayon`
//! - **Factor graph**: the butterfly structure of `x = u·B_N·F^{⊗n}` as a
//!   bipartite graph of variables and parity checks
//! - **Sparsification**: eliminate frozen variables, degree-2 checks and
//!   dangling auxiliary variables without changing the code
//! - **Decoding**: min-sum or exhaustive ML on the sparse graph
//!
//! ## Construction Flow
//!
//! ```text
//! BmsChannel → FrozenBitSelector → frozen set → PolarCode
//!                                                  │
//!                              PolarFactorGraph ←──┘ → sparsify → H → Decoder
//! ```
//!
//! ## Example
//!
//! ```rust
//! use polargraph_core::prelude::*;
//!
//! let channel = BmsChannel::bsc(0.1).unwrap();
//! let frozen = compute_frozen_indices(&channel, 3, 4, Some(0.1), None).unwrap();
//! assert_eq!(frozen, vec![0, 1, 2, 4]);
//!
//! let mut code = PolarCode::new(3, frozen).unwrap();
//! let codeword = code.encode(&[1, 0, 0, 1]).unwrap();
//!
//! let mut decoder = SparsePolarDecoder::new(&mut code, DecoderKind::default()).unwrap();
//! let llr: Vec<f64> = codeword.iter().map(|&b| if b == 1 { -3.0 } else { 3.0 }).collect();
//! assert_eq!(decoder.decode(&llr).unwrap().codeword, codeword);
//! ```

pub mod bit_reversal;
pub mod config;
pub mod decoder;
pub mod factor_graph;
pub mod fec;
pub mod gf2;
pub mod linear_code;
pub mod observe;
pub mod types;

pub use bit_reversal::{bit_reversal_permutation, bit_reverse};
pub use config::{ChannelConfig, ConfigError, PolarConfig, SelectionConfig};
pub use decoder::{DecodeOutput, Decoder, DecoderKind, SparsePolarDecoder};
pub use factor_graph::{CheckId, FactorGraph, VarId};
pub use fec::{
    compute_frozen_indices, BmsChannel, FrozenBitSelector, FrozenCriterion, PolarCode,
    PolarFactorGraph, SparsifyStats, ZStructure,
};
pub use gf2::Gf2Matrix;
pub use linear_code::BinaryLinearBlockCode;
pub use types::{Bit, BitVec, Llr, PolarError, PolarResult};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::decoder::{DecodeOutput, DecoderKind, SparsePolarDecoder};
    pub use crate::fec::{
        compute_frozen_indices, BmsChannel, FrozenBitSelector, FrozenCriterion, PolarCode,
        PolarFactorGraph,
    };
    pub use crate::gf2::Gf2Matrix;
    pub use crate::types::{PolarError, PolarResult};
}
