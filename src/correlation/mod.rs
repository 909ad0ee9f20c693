/// Correlation core: turns alert text into incident decisions
///
/// This module provides:
/// - Correlation key extraction from free-form alert text
/// - Text marker detection (triggered/recovered/started/resolved + severity tags)
/// - The time-windowed incident cache with lazy expiry
/// - The trigger/recovery classifier with its flap-count gate

pub mod cache;
pub mod classifier;
pub mod clock;
pub mod extractor;
pub mod markers;

pub use cache::{CorrelationCache, SuppressionPolicy};
pub use classifier::{AlertClassifier, Decision};
pub use clock::{Clock, ManualClock, SystemClock};
pub use extractor::{KeyExtractor, KeyShape};
pub use markers::{MarkerSet, Markers};
