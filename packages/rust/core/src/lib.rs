//! Trigger evaluation for WikiTrigger.
//!
//! Turns raw feed items into deliverable events: normalization, cursor
//! encoding, watermark-based dedup, and response assembly, tied together
//! by [`TriggerEngine`].

pub mod cursor;
pub mod engine;
pub mod normalize;
pub mod respond;
pub mod select;

pub use cursor::CursorCodec;
pub use engine::{Evaluation, EvaluationStats, TriggerEngine};
pub use normalize::{Normalized, normalize, normalize_item, parse_timestamp};
pub use respond::{PlatformResponder, Responder, TriggerResponse, error_body, event_object};
pub use select::{SelectionResult, select};
