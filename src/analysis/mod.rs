//! Signal preparation: moving averages, smoothing, returns and state seeding

pub mod indicators;
pub mod kmeans;
pub mod returns;
pub mod smoothing;

pub use indicators::{first_complete_row, rolling_mean};
pub use kmeans::{KMeans, KMeansFit};
pub use returns::{normalize_returns, pct_change, NormalizedReturns, ReturnScaler};
pub use smoothing::SavitzkyGolay;
