pub mod classify;
pub mod detect;
pub mod resolve;
pub mod savings;

pub use classify::{classify, risk_of};
pub use detect::{WasteVerdict, detect};
pub use resolve::resolve_execution_mode;
pub use savings::{SavingsEstimator, savings_band};
