pub mod error;
pub mod history;
pub mod store;
pub mod testing;

pub use error::StateError;
pub use history::HistoryStore;
pub use store::RecommendationStore;
