//! Touchline sync agent: drives the realtime feeds end to end against the
//! in-memory store and logs what each feed shows.

pub mod config;
pub mod exercise;
