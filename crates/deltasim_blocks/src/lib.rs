//! Reusable blocks built on the deltasim kernel.
//!
//! Each block is a function taking a [`Scope`](deltasim_kernel::Scope) and
//! its port signals and returning a [`Block`](deltasim_kernel::Block):
//!
//! - [`clock()`] — bounded or free-running square wave
//! - [`counter()`] — edge-triggered up-counter with optional reset
//! - [`fifo()`] — synchronous FIFO with full/empty flags
//! - [`transactor()`] / [`ack_responder`] — request/acknowledge handshake
//!   with an edge budget
//!
//! [`Script`] drives stimulus from a list of steps, and [`demo`] bundles
//! complete designs for the command line.

#![warn(missing_docs)]

pub mod clock;
pub mod counter;
pub mod demo;
pub mod fifo;
pub mod stimulus;
pub mod transactor;

pub use clock::{clock, ClockConfig};
pub use counter::counter;
pub use demo::{designs, find_design, DemoParams, Design};
pub use fifo::{fifo, FifoInputs, FifoPorts};
pub use stimulus::{Script, Step};
pub use transactor::{ack_responder, transactor, AckPoller, Handshake};
