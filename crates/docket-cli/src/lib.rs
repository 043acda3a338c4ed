//! # docket-cli — Library Crate
//!
//! Subcommand implementations for the `docket` binary. The CLI is a
//! third-party verifier's tool: everything it does can be done without
//! write access to any registry, and the `verify` command talks to a
//! running registry over plain HTTP.

pub mod fingerprint;
pub mod summary;
pub mod verify;

pub(crate) mod retry;
