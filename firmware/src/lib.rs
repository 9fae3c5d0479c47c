#![no_std]

extern crate alloc;

pub mod clock;
pub mod fetch;
