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

pub use crate::apm::{
    ApmConfig, ApmError, AudioProcessing, ChannelLayout, NullProcessor, ProcessingStats,
    StreamConfig,
};
pub use crate::audio_frame::{AccumulateOutcome, AudioFrame, SkipReason, SpeechType, VadActivity};
pub use crate::audio_frame_ops::{mono_to_stereo, stereo_to_mono, swap_stereo_channels};
pub use crate::audio_mixer::{
    mix_frames, AudioFrameInfo, AudioMixer, AudioMixerSource, MixStats, MixerOptions,
};
pub use crate::MixerError;
