//! Command implementations for blocksplit-cmd

pub mod cat;
pub mod compress;
pub mod inspect;
pub mod splits;
