//! Thread Triage — conversation state inference core.

pub mod ai;
pub mod audit;
pub mod config;
pub mod error;
pub mod resolver;
pub mod rules;
pub mod signals;
pub mod types;

pub use ai::{AiAnnotation, AiAugmenter, AiBudget, AiMode, AiOutcome, AiRequest, SkipReason};
pub use audit::{apply_outcome_override, build_snapshot, AuditSnapshot, OutcomeOverride};
pub use config::InferenceConfig;
pub use error::{AiError, Error, Result};
pub use resolver::{annotate, resolve, resolve_annotated, ConversationContext};
pub use types::{
    AnnotatedMessage, Confidence, ConversationState, Direction, InferenceResult, Message,
    MessageKind, Reason,
};
