//! Songbird voice event handlers and the empty-channel leave timer.

pub mod events;
pub mod idle;

pub use idle::{check_listeners, EmptyChannelWatch};
