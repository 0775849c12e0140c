//! STOMP 1.2 messaging over a raw WebSocket.
//!
//! The server brokers chat through STOMP: clients CONNECT once, SUBSCRIBE
//! to room and user destinations, and SEND application frames at
//! `/app/...`. [`frame`] is the wire codec; [`session`] drives a connected
//! socket with reader and writer tasks and hands inbound traffic to the
//! caller as [`SessionEvent`]s.

pub mod frame;
pub mod session;

pub use frame::{Command, Frame, FrameError};
pub use session::{GatewayError, GatewaySession, SessionEvent, SubscriptionId};
