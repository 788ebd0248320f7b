pub mod loader;

pub use loader::{display_timezone, load_config, parse_config};
