//! Core types with newtype pattern for type safety.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Capture timestamp in nanoseconds.
///
/// Timestamps key the container's frame index; every frame and audio chunk
/// carries one.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Sentinel for "no timestamp" (audio chunks in recordings that predate
    /// the audio metadata record).
    pub const NONE: Self = Self(-1);

    pub fn from_nanos(ns: i64) -> Self {
        Self(ns)
    }

    pub fn as_nanos(self) -> i64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1e9
    }

    pub fn is_none(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

/// Image resolution in pixels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// CFA (Bayer) pattern of the sensor — which of R/G/B each pixel of the
/// repeating 2x2 tile measures.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CfaPattern {
    #[default]
    Rggb,
    Bggr,
    Grbg,
    Gbrg,
}

impl CfaPattern {
    /// Parse the lowercase arrangement name used in container metadata.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "rggb" => Some(Self::Rggb),
            "bggr" => Some(Self::Bggr),
            "grbg" => Some(Self::Grbg),
            "gbrg" => Some(Self::Gbrg),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rggb => "rggb",
            Self::Bggr => "bggr",
            Self::Grbg => "grbg",
            Self::Gbrg => "gbrg",
        }
    }

    /// Component of each 2x2 tile position, row-major: 0 = red, 1 = green,
    /// 2 = blue.
    pub fn component_offsets(self) -> [u8; 4] {
        match self {
            Self::Rggb => [0, 1, 1, 2],
            Self::Bggr => [2, 1, 1, 0],
            Self::Grbg => [1, 0, 2, 1],
            Self::Gbrg => [1, 2, 0, 1],
        }
    }
}

impl fmt::Display for CfaPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a frame or audio offsets table — where in the file the
/// payload captured at `timestamp` starts.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BufferOffset {
    pub timestamp: Timestamp,
    /// Absolute byte position of the record header.
    pub offset: i64,
}

/// A chunk of interleaved PCM audio from the container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioChunk {
    /// Capture timestamp, or [`Timestamp::NONE`] when the recording omits
    /// the audio metadata record.
    pub timestamp: Timestamp,
    /// Interleaved signed 16-bit samples.
    pub samples: Vec<i16>,
}
