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

//! In-place channel layout conversions on [`AudioFrame`].

use crate::{audio_frame::AudioFrame, MixerError};

/// Writes each mono sample of `src` twice into `dst`.
pub fn mono_to_stereo_slice(src: &[i16], dst: &mut [i16]) {
    assert!(dst.len() >= src.len() * 2, "dst buffer too small");
    for (pair, sample) in dst.chunks_exact_mut(2).zip(src) {
        pair[0] = *sample;
        pair[1] = *sample;
    }
}

/// Averages each interleaved L/R pair of `src` into `dst`.
pub fn stereo_to_mono_slice(src: &[i16], dst: &mut [i16]) {
    assert!(dst.len() >= src.len() / 2, "dst buffer too small");
    for (sample, pair) in dst.iter_mut().zip(src.chunks_exact(2)) {
        *sample = ((i32::from(pair[0]) + i32::from(pair[1])) >> 1) as i16;
    }
}

/// Duplicates a mono frame into both channels of an interleaved stereo frame.
///
/// `samples_per_channel` is unchanged; the live region doubles.
pub fn mono_to_stereo(frame: &mut AudioFrame) -> Result<(), MixerError> {
    if frame.num_channels() != 1 {
        return Err(MixerError::UnsupportedUpmix { from: frame.num_channels(), to: 2 });
    }
    let samples = frame.samples_per_channel();
    frame.set_layout(samples, 2)?;

    // Walk backwards so each mono sample is read before its slot is overwritten.
    let data = frame.raw_mut();
    for i in (0..samples).rev() {
        let sample = data[i];
        data[2 * i] = sample;
        data[2 * i + 1] = sample;
    }
    Ok(())
}

/// Downmixes an interleaved stereo frame to mono by averaging L and R.
pub fn stereo_to_mono(frame: &mut AudioFrame) -> Result<(), MixerError> {
    if frame.num_channels() != 2 {
        return Err(MixerError::UnsupportedUpmix { from: frame.num_channels(), to: 1 });
    }
    let samples = frame.samples_per_channel();

    let data = frame.raw_mut();
    for i in 0..samples {
        data[i] = ((i32::from(data[2 * i]) + i32::from(data[2 * i + 1])) >> 1) as i16;
    }
    frame.set_layout(samples, 1)
}

pub fn swap_stereo_channels(frame: &mut AudioFrame) {
    if frame.num_channels() != 2 {
        return;
    }
    for pair in frame.data_mut().chunks_exact_mut(2) {
        pair.swap(0, 1);
    }
}
