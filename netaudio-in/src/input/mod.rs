//! Network audio input
//!
//! A [`BlockConsumer`] attaches to one stream of a shared [`Multiplexer`]
//! and forwards one stereo block per tick to its sink.
//!
//! [`Multiplexer`]: crate::multiplexer::Multiplexer

pub mod consumer;
pub mod discovery;
pub mod loss;
pub mod subscription;

pub use consumer::BlockConsumer;
pub use discovery::{eligible_streams, next_eligible_stream, EligibleStreams};
pub use loss::{LossStats, LossTracker};
pub use subscription::{Released, StreamSubscription, Subscribed};
