//! Wire types shared by the parley client crates.
//!
//! Everything here mirrors the server's JSON shapes (camelCase fields);
//! nothing in this crate talks to the network itself.

pub mod api;
pub mod models;
pub mod time;
