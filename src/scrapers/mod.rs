//! Site profiles

pub mod metro;
