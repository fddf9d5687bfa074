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

use thiserror::Error;

pub mod apm;
pub mod audio_frame;
pub mod audio_frame_ops;
pub mod audio_mixer;
pub mod prelude;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixerError {
    /// The requested live region does not fit in the frame buffer.
    #[error("frame needs {required} samples but only {capacity} fit")]
    BufferOverflow { required: usize, capacity: usize },

    /// The source slice handed to `update_frame` is shorter than the live region.
    #[error("source slice has {provided} samples, {required} required")]
    SourceTooShort { required: usize, provided: usize },

    /// The accumulator has fewer channels than the frame being mixed into it.
    #[error("cannot mix a {frame}-channel frame into a {mixed}-channel frame")]
    ChannelMismatch { mixed: usize, frame: usize },

    #[error("unsupported channel conversion: {from} -> {to}")]
    UnsupportedUpmix { from: usize, to: usize },

    /// Mixed output must be mono or stereo.
    #[error("unsupported output channel count: {0}")]
    UnsupportedChannelCount(usize),
}
