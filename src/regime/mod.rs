//! Regime labeling, segmentation and the detection pipeline

pub mod detector;
pub mod frame;
pub mod labeler;
pub mod segments;

pub use detector::{ModelSummary, RegimeDetector, RegimePoint, RegimeReport, SeriesPoint};
pub use frame::RegimeFrame;
pub use labeler::{current_regime, label_regimes, LabelMap, StateLabel};
pub use segments::{build_segments, index_runs, LabelStats, RegimeStats, Segment};
