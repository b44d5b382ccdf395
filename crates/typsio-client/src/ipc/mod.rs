//! Transport-facing side of the correlation layer.
//!
//! - `dispatcher`: outbound calls and the caller's `PendingReply`
//! - `router`: inbound replies and disconnect sweeps

pub mod dispatcher;
pub mod router;

pub use dispatcher::{CallDispatcher, PendingReply};
pub use router::ReplyRouter;
