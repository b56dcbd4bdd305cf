//! Application layer: the per-frame display pipeline.
//!
//! `channel_select` and `update_display` turn a digit grid into bus
//! transactions, `initialize` brings the modules up, `recovery` heals the
//! bus after glitches, and `service` owns the whole pipeline on a dedicated
//! thread.

pub mod channel_select;
pub mod initialize;
pub mod recovery;
pub mod service;
pub mod update_display;
