//! Conversation-context management for the Slate voice agent.
//!
//! Owns the rolling dialogue history and the pre-inference mutation policy:
//! on every assistant turn the history is truncated to a bounded number of
//! turns, then a freshly sampled video frame (if one is available) is
//! appended as the final user turn. This is the single extension point
//! between "user finished speaking" and "invoke the language model".
//!
//! The two rules that matter:
//!
//! - the system prompt at position 0 is never evicted, and at most
//!   `max_turns` non-system turns survive a truncation pass, oldest evicted
//!   first;
//! - the injected frame always reflects a fresh capture taken after
//!   truncation, so it is never evicted on the pass that created it and is
//!   never a stale value reused from an earlier turn.

pub mod history;
pub mod manager;

pub use history::{ChatHistory, Role, Turn, TurnContent};
pub use manager::{ContextConfig, ContextManager, DEFAULT_MAX_TURNS};
