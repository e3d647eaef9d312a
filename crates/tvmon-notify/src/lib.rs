//! Outbound delivery of monitor payloads.
//!
//! Every emission is addressed to a [`Feed`](tvmon_common::feed::Feed).
//! The [`RoutingTable`] maps each feed to zero or more HTTP recipients and
//! the [`WebhookPublisher`] POSTs the payload to each of them without
//! waiting for the result.

pub mod error;
pub mod routing;
pub mod utils;
pub mod webhook;


pub use error::{NotifyError, Result};
pub use routing::{Recipient, RoutingTable};
pub use webhook::WebhookPublisher;
