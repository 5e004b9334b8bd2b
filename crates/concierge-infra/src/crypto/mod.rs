//! Hashing primitives.

pub mod hash;
