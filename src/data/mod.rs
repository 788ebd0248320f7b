pub mod bar_store;
pub mod resampler;
pub mod source_files;
pub mod spike_detector;
pub mod tick_reader;

pub use bar_store::{BarStore, MemoryBarStore, SqliteBarStore};
pub use resampler::{Resampler, VolumeGate};
pub use source_files::discover_sources;
pub use spike_detector::{source_label, SpikeDetector};
pub use tick_reader::TickReader;
