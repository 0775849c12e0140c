//! Terminal chat client.
//!
//! Puts the other crates together: [`session`] remembers who you were,
//! [`room`] drives a joined room over REST plus the gateway, [`private`]
//! wraps one encrypted conversation, and [`command`]/[`validate`]/
//! [`format`] handle the line-oriented front end. The `parley` binary in
//! `main.rs` is the only place that prints.

pub mod command;
pub mod config;
pub mod format;
pub mod private;
pub mod room;
pub mod session;
pub mod validate;
