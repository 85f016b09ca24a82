//! Company extraction for portscout.
//!
//! Turns crawled page signals into [`CompanySeed`](portscout_shared::CompanySeed)s
//! by sending a bounded JSON payload to an LLM and repairing its reply.

pub mod openrouter;
pub mod payload;
pub mod repair;

pub use openrouter::{OpenRouterExtractor, normalize_website, parse_seeds};
pub use payload::{AnchorHint, ExtractionPayload};
pub use repair::{parse_array, repair_json};
