// Copyright 2025 LiveKit, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Interface to the audio processing stage (echo cancellation, noise suppression,
//! gain control, voice detection) that consumes mixed frames.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio_frame::{AudioFrame, VadActivity};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApmError {
    #[error("invalid stream delay: {0}ms")]
    InvalidDelay(i32),
    #[error(
        "unsupported format: {sample_rate_hz}Hz, {num_channels} channels, \
         {samples_per_channel} samples"
    )]
    UnsupportedFormat { sample_rate_hz: u32, num_channels: usize, samples_per_channel: usize },
    #[error("invalid analog level: {0}")]
    InvalidAnalogLevel(i32),
    #[error("processing failed: {0}")]
    Processing(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    Mono,
    MonoAndKeyboard,
    Stereo,
    StereoAndKeyboard,
}

/// Format of one 10 ms chunk handed to the processing stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    pub sample_rate_hz: u32,
    pub num_channels: usize,
    pub has_keyboard: bool,
}

impl StreamConfig {
    pub fn new(sample_rate_hz: u32, num_channels: usize, has_keyboard: bool) -> Self {
        Self { sample_rate_hz, num_channels, has_keyboard }
    }

    pub fn from_frame(frame: &AudioFrame) -> Self {
        Self::new(frame.sample_rate_hz, frame.num_channels(), false)
    }

    /// Frames per channel in a 10 ms chunk.
    pub fn num_frames(&self) -> usize {
        self.sample_rate_hz as usize / 100
    }

    pub fn num_samples(&self) -> usize {
        self.num_frames() * self.num_channels
    }

    pub fn layout(&self) -> Option<ChannelLayout> {
        match (self.num_channels, self.has_keyboard) {
            (1, false) => Some(ChannelLayout::Mono),
            (1, true) => Some(ChannelLayout::MonoAndKeyboard),
            (2, false) => Some(ChannelLayout::Stereo),
            (2, true) => Some(ChannelLayout::StereoAndKeyboard),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceDetectionLikelihood {
    VeryLow,
    Low,
    #[default]
    Moderate,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoCancellationConfig {
    pub enabled: bool,
    pub enable_metrics: bool,
    /// Requires `set_stream_drift_samples` to be called for every processed chunk.
    pub enable_drift_compensation: bool,
}

impl Default for EchoCancellationConfig {
    fn default() -> Self {
        Self { enabled: true, enable_metrics: true, enable_drift_compensation: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApmConfig {
    pub echo_cancellation: EchoCancellationConfig,
    pub gain_control: bool,
    pub high_pass_filter: bool,
    pub noise_suppression: bool,
    pub level_estimator: bool,
    pub voice_detection: bool,
    pub voice_detection_likelihood: VoiceDetectionLikelihood,
}

impl Default for ApmConfig {
    fn default() -> Self {
        Self {
            echo_cancellation: EchoCancellationConfig::default(),
            gain_control: true,
            high_pass_filter: true,
            noise_suppression: true,
            level_estimator: true,
            voice_detection: true,
            voice_detection_likelihood: VoiceDetectionLikelihood::default(),
        }
    }
}

/// Side outputs of processing one capture chunk.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ProcessingStats {
    /// Recommended analog microphone level, 0..=255.
    pub stream_analog_level: i32,
    pub stream_has_voice: bool,
    pub speech_probability: f32,
}

/// A processing stage fed with mixed frames.
///
/// Implementations own any interleaved/planar conversion they need.
pub trait AudioProcessing {
    fn initialize(&mut self, config: &ApmConfig) -> Result<(), ApmError>;

    /// Delay between the far-end frame being analyzed and the near-end frame
    /// being processed.
    fn set_stream_delay_ms(&mut self, delay_ms: i32) -> Result<(), ApmError>;

    fn set_stream_drift_samples(&mut self, drift: i32);

    /// Current analog microphone level, fed back from the previous
    /// `ProcessingStats::stream_analog_level`.
    fn set_stream_analog_level(&mut self, level: i32) -> Result<(), ApmError>;

    /// Feeds a far-end (render) frame used as the echo reference.
    fn analyze_reverse_stream(&mut self, frame: &AudioFrame) -> Result<(), ApmError>;

    /// Processes a near-end (capture) frame in place.
    fn process_stream(&mut self, frame: &mut AudioFrame) -> Result<ProcessingStats, ApmError>;
}

const MAX_STREAM_DELAY_MS: i32 = 500;
const MAX_ANALOG_LEVEL: i32 = 255;
const SUPPORTED_SAMPLE_RATES: [u32; 4] = [8000, 16000, 32000, 48000];

fn check_format(frame: &AudioFrame) -> Result<StreamConfig, ApmError> {
    let config = StreamConfig::from_frame(frame);
    if !SUPPORTED_SAMPLE_RATES.contains(&config.sample_rate_hz)
        || config.layout().is_none()
        || frame.samples_per_channel() != config.num_frames()
    {
        return Err(ApmError::UnsupportedFormat {
            sample_rate_hz: frame.sample_rate_hz,
            num_channels: frame.num_channels(),
            samples_per_channel: frame.samples_per_channel(),
        });
    }
    Ok(config)
}

/// Pass-through processor: validates formats, leaves samples untouched and derives
/// its voice flag from the frame's VAD state.
#[derive(Debug, Default)]
pub struct NullProcessor {
    config: ApmConfig,
    stream_delay_ms: i32,
    drift_samples: i32,
    analog_level: i32,
    reverse_frames: u64,
}

impl NullProcessor {
    pub fn new(config: ApmConfig) -> Self {
        Self { config, analog_level: MAX_ANALOG_LEVEL, ..Default::default() }
    }

    pub fn config(&self) -> &ApmConfig {
        &self.config
    }

    pub fn stream_delay_ms(&self) -> i32 {
        self.stream_delay_ms
    }

    pub fn drift_samples(&self) -> i32 {
        self.drift_samples
    }

    pub fn reverse_frames(&self) -> u64 {
        self.reverse_frames
    }
}

impl AudioProcessing for NullProcessor {
    fn initialize(&mut self, config: &ApmConfig) -> Result<(), ApmError> {
        self.config = *config;
        self.stream_delay_ms = 0;
        self.drift_samples = 0;
        self.reverse_frames = 0;
        self.analog_level = MAX_ANALOG_LEVEL;
        Ok(())
    }

    fn set_stream_delay_ms(&mut self, delay_ms: i32) -> Result<(), ApmError> {
        if !(0..=MAX_STREAM_DELAY_MS).contains(&delay_ms) {
            return Err(ApmError::InvalidDelay(delay_ms));
        }
        self.stream_delay_ms = delay_ms;
        Ok(())
    }

    fn set_stream_drift_samples(&mut self, drift: i32) {
        self.drift_samples = drift;
    }

    fn set_stream_analog_level(&mut self, level: i32) -> Result<(), ApmError> {
        if !(0..=MAX_ANALOG_LEVEL).contains(&level) {
            return Err(ApmError::InvalidAnalogLevel(level));
        }
        self.analog_level = level;
        Ok(())
    }

    fn analyze_reverse_stream(&mut self, frame: &AudioFrame) -> Result<(), ApmError> {
        check_format(frame)?;
        self.reverse_frames += 1;
        Ok(())
    }

    fn process_stream(&mut self, frame: &mut AudioFrame) -> Result<ProcessingStats, ApmError> {
        check_format(frame)?;

        let stream_has_voice =
            self.config.voice_detection && frame.vad_activity == VadActivity::Active;
        Ok(ProcessingStats {
            stream_analog_level: self.analog_level,
            stream_has_voice,
            speech_probability: if stream_has_voice { 1.0 } else { 0.0 },
        })
    }
}
