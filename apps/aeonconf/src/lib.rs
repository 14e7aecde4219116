//! # aeonconf
//!
//! Command line front end for `aeonconf-core`: loads recipe manifests and
//! option profiles, picks the target platform, runs the resolver and
//! writes its outputs.

pub mod cli;
pub mod config;
