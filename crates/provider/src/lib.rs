pub mod context;
pub mod error;
pub mod mutation;
pub mod notify;
pub mod producer;
pub mod resources;

pub use context::{ContextItem, ContextStore};
pub use error::ProviderError;
pub use mutation::{DynMutationExecutor, MutationExecutor, MutationOutcome};
pub use notify::{NotificationEvent, Notifier};
pub use producer::{RawRecommendation, RecommendationProducer};
pub use resources::ResourceProvider;
