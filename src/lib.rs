//! Live fantasy-football scoring for the FPL Buddy desk gadget
//!
//! Everything here is `no_std` and free of hardware: the firmware crate feeds
//! it decoded API payloads and renders what comes out.

#![cfg_attr(not(test), no_std)]

pub mod api;
pub mod bonus;
pub mod config;
pub mod engine;
pub mod event;
pub mod json;
pub mod pick;
pub mod poll;
pub mod rules;
pub mod shared;
pub mod stats;
pub mod summary;
pub mod text;
