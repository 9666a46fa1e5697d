//! Request-flow services and the clients for external collaborators

pub mod access;
pub mod dispatcher;
pub mod generation;
pub mod identity;
pub mod recorder;
pub mod tiers;

pub use access::{authorize, requested_tier, AccessDenied};
pub use dispatcher::{DispatchError, PromptDispatcher};
pub use generation::{ChatMessage, CompletionRequest, GenerationError, OpenAiClient, TextGenerator};
pub use identity::{IdentityError, IdentityProvider, SupabaseAuth};
pub use recorder::HistoryRecorder;
pub use tiers::TierResolver;
