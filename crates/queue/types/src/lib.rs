//! Service Queue Domain Types
//!
//! Types shared by every part of the front-desk dispatch core. A visitor
//! receives a [`Token`] for a [`Department`]; operators call tokens to a
//! counter and the token walks a one-way lifecycle until it is completed or
//! marked as a no-show.
//!
//! # Key Concepts
//!
//! - **Token**: one visitor's place in a department queue, numbered
//!   sequentially across the whole store.
//! - **Priority**: `emergency`, `urgent` or `normal`; the primary dispatch key.
//! - **TokenStatus**: `waiting → called → serving → completed`, with
//!   `no-show` reachable from `waiting` and `called`.
//! - **Department**: a catalogue entry with the counters that serve it.
//! - **DispatchNotice**: what the outside world hears about a dispatch.
//!
//! # Lifecycle Rules
//!
//! 1. Tokens never move backwards.
//! 2. A counter number is attached exactly while a token is called or
//!    being served.
//! 3. Terminal tokens stay in the store; purging is someone else's job.

#![deny(unsafe_code)]

mod department;
mod errors;
mod event;
mod ids;
mod priority;
mod status;
mod token;

pub use department::*;
pub use errors::*;
pub use event::*;
pub use ids::*;
pub use priority::*;
pub use status::*;
pub use token::*;
