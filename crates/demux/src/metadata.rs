//! Typed views of the container and per-frame JSON metadata documents.
//!
//! The documents are small, so they are parsed eagerly into structs;
//! unrecognized keys are preserved in a flattened map for downstream
//! consumers (DNG writers care about more keys than the reader does).

use mcraw_common::{CfaPattern, Resolution};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Camera and device properties stored once per container.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerMetadata {
    /// Per-CFA-component black levels.
    pub black_level: Vec<f64>,
    /// Sensor saturation value.
    pub white_level: Option<f64>,
    /// CFA layout name; the on-disk key has always been spelled this way.
    #[serde(rename = "sensorArrangment")]
    pub sensor_arrangment: Option<String>,
    /// XYZ-to-camera matrix under the first calibration illuminant.
    pub color_matrix1: Option<[f64; 9]>,
    /// XYZ-to-camera matrix under the second calibration illuminant.
    pub color_matrix2: Option<[f64; 9]>,
    /// Camera-to-XYZ forward matrix under the first illuminant.
    pub forward_matrix1: Option<[f64; 9]>,
    /// Camera-to-XYZ forward matrix under the second illuminant.
    pub forward_matrix2: Option<[f64; 9]>,
    pub software: Option<String>,
    pub orientation: Option<i32>,
    pub extra_data: Option<ExtraData>,
    /// Everything else, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Audio and capture extras nested under `extraData`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtraData {
    pub audio_sample_rate: Option<u32>,
    pub audio_channels: Option<u16>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContainerMetadata {
    /// CFA layout of the sensor; `rggb` when unspecified or unrecognized.
    pub fn sensor_arrangement(&self) -> CfaPattern {
        self.sensor_arrangment
            .as_deref()
            .and_then(CfaPattern::from_name)
            .unwrap_or_default()
    }

    pub fn audio_sample_rate_hz(&self) -> Option<u32> {
        self.extra_data.as_ref().and_then(|e| e.audio_sample_rate)
    }

    pub fn num_audio_channels(&self) -> Option<u16> {
        self.extra_data.as_ref().and_then(|e| e.audio_channels)
    }
}

/// Per-frame properties stored beside each frame buffer.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameMetadata {
    /// Declared output width; at most the encoded width.
    pub width: u32,
    /// Declared output height; at most the encoded height.
    pub height: u32,
    /// Codec tag; this reader only understands the raw block codec.
    pub compression_type: u32,
    /// Per-frame white balance as shot.
    #[serde(default)]
    pub as_shot_neutral: Option<[f64; 3]>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FrameMetadata {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}
