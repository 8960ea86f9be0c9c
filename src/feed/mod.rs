//! Feed retrieval and content normalization.
//!
//! This is the decision-heavy part of the system: it copes with unreliable
//! transport, inconsistent feed schemas, and messy embedded markup, and
//! turns them into a clean, ordered sequence of [`EntryRecord`]s.
//!
//! # Architecture
//!
//! - [`transport`] — one bounded HTTP attempt with rotating identification
//!   headers; no retry policy of its own
//! - [`parser`] — best-effort bytes-to-[`RawFeed`] conversion that never
//!   fails, plus the parser-managed retrieval path used by the primary tier
//! - [`extract`] — per-entry field selection and markup stripping
//! - [`normalize`] — assembles [`EntryRecord`]s, dropping contentless
//!   entries
//! - [`orchestrator`] — the two-tier fetch state machine and validation
//!   gate; exposes the single entry point, [`FeedFetcher::entries`]

pub mod extract;
pub mod normalize;
pub mod orchestrator;
pub mod parser;
pub mod transport;

pub use normalize::EntryRecord;
pub use orchestrator::{FeedError, FeedFetcher};
pub use parser::{RawEntry, RawFeed};
pub use transport::{TransportError, UserAgentPool};
