//! Rendering a [`TrackRecord`] into an output format.
//!
//! Text formats (JSON, RON, TOML) are written as-is. Bitcode output is
//! wrapped in a versioned header so a loader can reject foreign or stale
//! files before decoding the payload.

use crate::schema::TrackRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a compiled track file.
pub const TRACK_MAGIC: u32 = 0x7EAC_0001;

/// Current format version. Increment when breaking the binary layout.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while emitting or reading back a track.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    /// The format name is not one we write.
    #[error("unknown output format '{name}' (expected json, ron, toml or bitcode)")]
    UnknownFormat { name: String },

    /// The output path has an extension we can't map to a format.
    #[error("cannot infer output format from {file}")]
    UnsupportedExtension { file: PathBuf },

    #[error("{format} encoding failed: {detail}")]
    Encode { format: Format, detail: String },

    #[error("{format} decoding failed: {detail}")]
    Decode { format: Format, detail: String },

    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", TRACK_MAGIC, .0)]
    InvalidMagic(u32),

    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),

    #[error("track file from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
}

// ---------------------------------------------------------------------------
// Format
// ---------------------------------------------------------------------------

/// Supported output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    Ron,
    Toml,
    Bitcode,
}

impl Format {
    pub fn is_binary(self) -> bool {
        matches!(self, Format::Bitcode)
    }

    pub fn extension(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Ron => "ron",
            Format::Toml => "toml",
            Format::Bitcode => "bin",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Json => "json",
            Format::Ron => "ron",
            Format::Toml => "toml",
            Format::Bitcode => "bitcode",
        };
        f.write_str(name)
    }
}

impl FromStr for Format {
    type Err = EmitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "ron" => Ok(Format::Ron),
            "toml" => Ok(Format::Toml),
            "bitcode" | "bin" => Ok(Format::Bitcode),
            _ => Err(EmitError::UnknownFormat {
                name: s.to_string(),
            }),
        }
    }
}

/// Detect the output format from a file extension.
pub fn detect_format(path: &Path) -> Result<Format, EmitError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("bin") | Some("bitcode") => Ok(Format::Bitcode),
        _ => Err(EmitError::UnsupportedExtension {
            file: path.to_path_buf(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Binary header
// ---------------------------------------------------------------------------

/// Header stored in front of every bitcode track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackHeader {
    pub magic: u32,
    pub version: u32,
}

impl TrackHeader {
    pub fn new() -> Self {
        Self {
            magic: TRACK_MAGIC,
            version: FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), EmitError> {
        if self.magic != TRACK_MAGIC {
            return Err(EmitError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(EmitError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(EmitError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

impl Default for TrackHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TrackFile {
    header: TrackHeader,
    track: TrackRecord,
}

// ---------------------------------------------------------------------------
// Emit / decode
// ---------------------------------------------------------------------------

/// Render a track in the given format.
pub fn emit(track: &TrackRecord, format: Format) -> Result<Vec<u8>, EmitError> {
    let encode_err = |detail: String| EmitError::Encode { format, detail };
    let bytes = match format {
        Format::Json => serde_json::to_vec_pretty(track)
            .map_err(|e| encode_err(e.to_string()))?,
        Format::Ron => ron::ser::to_string_pretty(track, ron::ser::PrettyConfig::default())
            .map_err(|e| encode_err(e.to_string()))?
            .into_bytes(),
        Format::Toml => toml::to_string_pretty(track)
            .map_err(|e| encode_err(e.to_string()))?
            .into_bytes(),
        Format::Bitcode => {
            let file = TrackFile {
                header: TrackHeader::new(),
                track: track.clone(),
            };
            bitcode::serialize(&file).map_err(|e| encode_err(e.to_string()))?
        }
    };
    tracing::debug!(%format, bytes = bytes.len(), nodes = track.nodes.len(), "emitted track");
    Ok(bytes)
}

/// Read back a track written by [`emit`].
pub fn decode(data: &[u8], format: Format) -> Result<TrackRecord, EmitError> {
    let decode_err = |detail: String| EmitError::Decode { format, detail };
    let text = || std::str::from_utf8(data).map_err(|e| decode_err(e.to_string()));
    match format {
        Format::Json => serde_json::from_slice(data).map_err(|e| decode_err(e.to_string())),
        Format::Ron => ron::from_str(text()?).map_err(|e| decode_err(e.to_string())),
        Format::Toml => toml::from_str(text()?).map_err(|e| decode_err(e.to_string())),
        Format::Bitcode => decode_bitcode(data),
    }
}

/// Decode a bitcode track, checking its header first.
pub fn decode_bitcode(data: &[u8]) -> Result<TrackRecord, EmitError> {
    let file: TrackFile = bitcode::deserialize(data).map_err(|e| EmitError::Decode {
        format: Format::Bitcode,
        detail: e.to_string(),
    })?;
    file.header.validate()?;
    Ok(file.track)
}

// ===========================================================================
// Tests
// ===========================================================================
