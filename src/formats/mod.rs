//! On-disk format parsers.

pub mod bytes;
pub mod cli;
pub mod pe;
