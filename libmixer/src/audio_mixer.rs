// Copyright 2023 LiveKit, Inc.
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

use serde::{Deserialize, Serialize};

use crate::{
    audio_frame::{AccumulateOutcome, AudioFrame, SpeechType, VadActivity},
    audio_frame_ops, MixerError,
};

/// Folds `frame` into `mixed_frame`.
///
/// With `use_limiter`, `frame` is halved first to leave headroom for a limiter
/// applied to the mixed output later on. A mono `frame` is upmixed in place when
/// `mixed_frame` is stereo, so callers must treat `frame` as modified.
pub fn mix_frames(
    mixed_frame: &mut AudioFrame,
    frame: &mut AudioFrame,
    use_limiter: bool,
) -> Result<AccumulateOutcome, MixerError> {
    let (mixed, contributor) = (mixed_frame.num_channels(), frame.num_channels());
    if mixed < contributor {
        return Err(MixerError::ChannelMismatch { mixed, frame: contributor });
    }
    // Only mono-to-stereo is supported.
    let upmix = mixed > contributor;
    if upmix && !(mixed == 2 && contributor == 1) {
        return Err(MixerError::UnsupportedUpmix { from: contributor, to: mixed });
    }
    let required = frame.samples_per_channel() * mixed;
    if upmix && required > AudioFrame::MAX_DATA_SIZE_SAMPLES {
        return Err(MixerError::BufferOverflow {
            required,
            capacity: AudioFrame::MAX_DATA_SIZE_SAMPLES,
        });
    }

    if use_limiter {
        frame.attenuate(1);
    }
    if upmix {
        audio_frame_ops::mono_to_stereo(frame)?;
    }

    Ok(mixed_frame.accumulate(frame))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerOptions {
    /// Halve every contribution to leave headroom for a downstream limiter.
    pub use_limiter: bool,
    /// Channel count of the mixed output, 1 or 2.
    pub num_channels: usize,
}

impl Default for MixerOptions {
    fn default() -> Self {
        Self { use_limiter: true, num_channels: 1 }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AudioFrameInfo {
    Normal,
    Muted,
    Error,
}

pub trait AudioMixerSource {
    fn ssrc(&self) -> i32;

    /// Loads the next frame into `frame`, which the mixer has reset beforehand.
    fn get_audio_frame(&mut self, frame: &mut AudioFrame) -> AudioFrameInfo;
}

/// What happened during one [`AudioMixer::mix`] call.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct MixStats {
    pub mixed: usize,
    pub muted: usize,
    pub failed: usize,
    /// Frames the mixer could not combine with the output (layout or length mismatch).
    pub skipped: usize,
}

/// Mixes a set of sources into one output frame per tick.
pub struct AudioMixer {
    options: MixerOptions,
    sources: Vec<Box<dyn AudioMixerSource + Send>>,
    scratch: Box<AudioFrame>,
}

impl AudioMixer {
    pub fn new(options: MixerOptions) -> Result<Self, MixerError> {
        if !matches!(options.num_channels, 1 | 2) {
            return Err(MixerError::UnsupportedChannelCount(options.num_channels));
        }
        Ok(Self { options, sources: Vec::new(), scratch: Box::default() })
    }

    pub fn options(&self) -> MixerOptions {
        self.options
    }

    pub fn add_source(&mut self, source: impl AudioMixerSource + Send + 'static) {
        log::debug!("adding mixer source {}", source.ssrc());
        self.sources.push(Box::new(source));
    }

    pub fn remove_source(&mut self, ssrc: i32) -> bool {
        let before = self.sources.len();
        self.sources.retain(|source| source.ssrc() != ssrc);
        let removed = self.sources.len() != before;
        if removed {
            log::debug!("removed mixer source {}", ssrc);
        }
        removed
    }

    pub fn num_sources(&self) -> usize {
        self.sources.len()
    }

    /// Clears `output` to an empty passive frame and mixes the current frame of
    /// every source into it.
    ///
    /// Sources are mixed in registration order. A source whose frame cannot be
    /// combined with the output is skipped; the remaining sources still mix.
    /// Sample rate and timestamp come from the first source that contributes.
    pub fn mix(&mut self, output: &mut AudioFrame) -> Result<MixStats, MixerError> {
        output.update_frame(
            -1,
            0,
            None,
            0,
            0,
            SpeechType::NormalSpeech,
            VadActivity::Passive,
            self.options.num_channels,
        )?;

        let mut stats = MixStats::default();
        for source in self.sources.iter_mut() {
            self.scratch.reset();
            match source.get_audio_frame(&mut self.scratch) {
                AudioFrameInfo::Normal => {}
                AudioFrameInfo::Muted => {
                    stats.muted += 1;
                    continue;
                }
                AudioFrameInfo::Error => {
                    log::warn!("mixer source {} failed to produce a frame", source.ssrc());
                    stats.failed += 1;
                    continue;
                }
            }

            match mix_frames(output, &mut self.scratch, self.options.use_limiter) {
                Ok(outcome) if !outcome.is_skipped() => {
                    // The first source that lands in the output defines its timing.
                    if outcome == AccumulateOutcome::Copied {
                        output.sample_rate_hz = self.scratch.sample_rate_hz;
                        output.timestamp = self.scratch.timestamp;
                    }
                    stats.mixed += 1;
                }
                Ok(outcome) => {
                    log::warn!("mixer source {} skipped: {:?}", source.ssrc(), outcome);
                    stats.skipped += 1;
                }
                Err(e) => {
                    log::warn!("mixer source {} skipped: {}", source.ssrc(), e);
                    stats.skipped += 1;
                }
            }
        }
        Ok(stats)
    }
}
