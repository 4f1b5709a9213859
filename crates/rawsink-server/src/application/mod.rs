//! Application layer for the rawsink server.
//!
//! # What is the "application" layer? (for beginners)
//!
//! The application layer sits between the pure rules in `rawsink_core`
//! (decoding, key state, encoding) and the infrastructure that talks to the
//! OS and the network.  It wires the rules together into a use case and
//! depends only on traits, so the infrastructure can be replaced by fakes in
//! tests.
//!
//! # Sub-modules
//!
//! - **`pipeline`** – The event queue and the drain loop that threads every
//!   queued event through the key state tracker and the encoder, then hands
//!   the datagram to a [`pipeline::Transport`].

pub mod pipeline;

pub use pipeline::{
    DrainLoop, DrainOptions, DrainOutcome, DrainStats, EventProducer, EventSink, Pipeline, Transport,
};
