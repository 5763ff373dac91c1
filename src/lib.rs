//! multifx - Real-time Multi-Effect Audio Chain
//!
//! A fixed chain of audio effects that is safe to run on a real-time audio
//! thread:
//!
//! input gain → distortion → delay → pan → EQ → output gain
//!
//! # Architecture
//!
//! - `dsp`: the stages, their shared building blocks and the `EffectChain`
//! - `params`: the static parameter table and the lock-free `ParameterStore`
//! - `engine`: audio buffers and WAV I/O
//! - `config`: chain configuration loaded from JSON
//!
//! `prepare` may allocate and report errors. `process`, `reset` and the
//! parameter setters never allocate, lock or fail.

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod params;

pub use config::ChainConfig;
pub use dsp::EffectChain;
pub use error::{FxError, Result};
pub use params::ParameterStore;
