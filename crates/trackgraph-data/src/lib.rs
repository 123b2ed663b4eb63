//! Output schema, emitters and config files for compiled tracks.

pub mod config;
pub mod emit;
pub mod schema;

pub use config::{load_config, Config, ConfigError, OutputConfig};
pub use emit::{decode, decode_bitcode, detect_format, emit, EmitError, Format};
pub use schema::TrackRecord;
