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

use std::fmt;

use crate::MixerError;

/// Voice activity attached to a frame by whoever produced it.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum VadActivity {
    Active,
    Passive,
    #[default]
    Unknown,
}

/// How the samples of a frame were produced.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SpeechType {
    NormalSpeech,
    /// Packet loss concealment.
    Plc,
    /// Comfort noise generation.
    Cng,
    PlcCng,
    #[default]
    Undefined,
}

/// Why `AudioFrame::accumulate` left the frame untouched.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// One of the frames is neither mono nor stereo.
    UnsupportedChannels,
    ChannelMismatch,
    /// Both frames carry samples but their lengths differ.
    LengthMismatch,
}

/// Result of accumulating one frame into another.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AccumulateOutcome {
    /// Samples were summed with saturation.
    Mixed,
    /// The accumulator was empty and took a verbatim copy.
    Copied,
    Skipped(SkipReason),
}

impl AccumulateOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

/// Up to 60 ms of 32 kHz stereo audio, interleaved starting with the left channel.
///
/// The buffer is a fixed array; only the first `samples_per_channel * num_channels`
/// samples are live. Frames are never implicitly cloned, use [`AudioFrame::copy_from`].
pub struct AudioFrame {
    pub id: i32,
    pub timestamp: u32,
    pub elapsed_time_ms: i64,
    pub ntp_time_ms: i64,
    pub sample_rate_hz: u32,
    pub speech_type: SpeechType,
    pub vad_activity: VadActivity,
    samples_per_channel: usize,
    num_channels: usize,
    data: [i16; AudioFrame::MAX_DATA_SIZE_SAMPLES],
}

impl Default for AudioFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AudioFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioFrame")
            .field("id", &self.id)
            .field("timestamp", &self.timestamp)
            .field("sample_rate_hz", &self.sample_rate_hz)
            .field("num_channels", &self.num_channels)
            .field("samples_per_channel", &self.samples_per_channel)
            .field("speech_type", &self.speech_type)
            .field("vad_activity", &self.vad_activity)
            .finish()
    }
}

impl AudioFrame {
    pub const MAX_DATA_SIZE_SAMPLES: usize = 3840;

    pub fn new() -> Self {
        Self {
            id: -1,
            timestamp: 0,
            elapsed_time_ms: -1,
            ntp_time_ms: -1,
            sample_rate_hz: 0,
            speech_type: SpeechType::Undefined,
            vad_activity: VadActivity::Unknown,
            samples_per_channel: 0,
            num_channels: 0,
            data: [0; Self::MAX_DATA_SIZE_SAMPLES],
        }
    }

    /// Clears the metadata. The sample buffer keeps its bytes but no longer has a live region.
    pub fn reset(&mut self) {
        self.id = -1;
        self.timestamp = 0;
        self.elapsed_time_ms = -1;
        self.ntp_time_ms = -1;
        self.samples_per_channel = 0;
        self.sample_rate_hz = 0;
        self.num_channels = 0;
        self.speech_type = SpeechType::Undefined;
        self.vad_activity = VadActivity::Unknown;
    }

    /// Overwrites samples and metadata together.
    ///
    /// `data` is copied into the frame; `None` zero-fills the live region instead.
    /// Fails without touching the frame if the live region would exceed
    /// [`AudioFrame::MAX_DATA_SIZE_SAMPLES`] or if `data` is too short.
    #[allow(clippy::too_many_arguments)]
    pub fn update_frame(
        &mut self,
        id: i32,
        timestamp: u32,
        data: Option<&[i16]>,
        samples_per_channel: usize,
        sample_rate_hz: u32,
        speech_type: SpeechType,
        vad_activity: VadActivity,
        num_channels: usize,
    ) -> Result<(), MixerError> {
        let length = checked_len(samples_per_channel, num_channels)?;
        if let Some(src) = data {
            if src.len() < length {
                return Err(MixerError::SourceTooShort { required: length, provided: src.len() });
            }
        }

        self.id = id;
        self.timestamp = timestamp;
        self.samples_per_channel = samples_per_channel;
        self.sample_rate_hz = sample_rate_hz;
        self.speech_type = speech_type;
        self.vad_activity = vad_activity;
        self.num_channels = num_channels;

        match data {
            Some(src) => self.data[..length].copy_from_slice(&src[..length]),
            None => self.data[..length].fill(0),
        }
        Ok(())
    }

    /// Copies every field of `src`, including exactly its live samples.
    pub fn copy_from(&mut self, src: &AudioFrame) {
        self.id = src.id;
        self.timestamp = src.timestamp;
        self.elapsed_time_ms = src.elapsed_time_ms;
        self.ntp_time_ms = src.ntp_time_ms;
        self.samples_per_channel = src.samples_per_channel;
        self.sample_rate_hz = src.sample_rate_hz;
        self.speech_type = src.speech_type;
        self.vad_activity = src.vad_activity;
        self.num_channels = src.num_channels;

        let length = src.len();
        self.data[..length].copy_from_slice(&src.data[..length]);
    }

    pub fn mute(&mut self) {
        self.data_mut().fill(0);
    }

    /// Arithmetic right shift of every live sample, i.e. a lossy gain of `2^-shift`.
    ///
    /// Frames that are neither mono nor stereo are left untouched.
    pub fn attenuate(&mut self, shift: u32) {
        if !is_mixable(self.num_channels) {
            return;
        }
        let shift = shift.min(i16::BITS - 1);
        for sample in self.data_mut() {
            *sample >>= shift;
        }
    }

    /// Mixes `other` into this frame.
    ///
    /// Samples are summed in 32 bits and clamped to the i16 range. An empty frame
    /// takes a verbatim copy of `other` instead. Incompatible frames are skipped and
    /// this frame is left unchanged; the returned outcome says which case applied.
    pub fn accumulate(&mut self, other: &AudioFrame) -> AccumulateOutcome {
        if !is_mixable(self.num_channels) || !is_mixable(other.num_channels) {
            return self.skip(other, SkipReason::UnsupportedChannels);
        }
        if self.num_channels != other.num_channels {
            return self.skip(other, SkipReason::ChannelMismatch);
        }

        let mut no_prev_data = false;
        if self.samples_per_channel != other.samples_per_channel {
            if self.samples_per_channel != 0 {
                return self.skip(other, SkipReason::LengthMismatch);
            }
            self.samples_per_channel = other.samples_per_channel;
            no_prev_data = true;
        }

        self.vad_activity = merge_vad(self.vad_activity, other.vad_activity);
        if self.speech_type != other.speech_type {
            self.speech_type = SpeechType::Undefined;
        }

        let length = self.len();
        if no_prev_data {
            self.data[..length].copy_from_slice(&other.data[..length]);
            return AccumulateOutcome::Copied;
        }

        for (dst, src) in self.data[..length].iter_mut().zip(&other.data[..length]) {
            *dst = clamp_to_i16(i32::from(*dst) + i32::from(*src));
        }
        AccumulateOutcome::Mixed
    }

    fn skip(&self, other: &AudioFrame, reason: SkipReason) -> AccumulateOutcome {
        log::trace!(
            "skipping accumulate ({:?}): {}ch x {} into {}ch x {}",
            reason,
            other.num_channels,
            other.samples_per_channel,
            self.num_channels,
            self.samples_per_channel
        );
        AccumulateOutcome::Skipped(reason)
    }

    /// The live samples.
    pub fn data(&self) -> &[i16] {
        &self.data[..self.len()]
    }

    pub fn data_mut(&mut self) -> &mut [i16] {
        let length = self.len();
        &mut self.data[..length]
    }

    /// Number of live samples across all channels.
    pub fn len(&self) -> usize {
        self.samples_per_channel * self.num_channels
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn samples_per_channel(&self) -> usize {
        self.samples_per_channel
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Duration of the live region, or 0 when the sample rate is unknown.
    pub fn duration_ms(&self) -> u32 {
        if self.sample_rate_hz == 0 {
            return 0;
        }
        (self.samples_per_channel as u64 * 1000 / self.sample_rate_hz as u64) as u32
    }

    /// Changes the channel layout, keeping the sample buffer as is.
    pub(crate) fn set_layout(
        &mut self,
        samples_per_channel: usize,
        num_channels: usize,
    ) -> Result<(), MixerError> {
        checked_len(samples_per_channel, num_channels)?;
        self.samples_per_channel = samples_per_channel;
        self.num_channels = num_channels;
        Ok(())
    }

    /// The whole backing buffer, live or not.
    pub(crate) fn raw_mut(&mut self) -> &mut [i16; AudioFrame::MAX_DATA_SIZE_SAMPLES] {
        &mut self.data
    }
}

fn checked_len(samples_per_channel: usize, num_channels: usize) -> Result<usize, MixerError> {
    match samples_per_channel.checked_mul(num_channels) {
        Some(length) if length <= AudioFrame::MAX_DATA_SIZE_SAMPLES => Ok(length),
        _ => Err(MixerError::BufferOverflow {
            required: samples_per_channel.saturating_mul(num_channels),
            capacity: AudioFrame::MAX_DATA_SIZE_SAMPLES,
        }),
    }
}

fn is_mixable(num_channels: usize) -> bool {
    matches!(num_channels, 1 | 2)
}

fn merge_vad(lhs: VadActivity, rhs: VadActivity) -> VadActivity {
    match (lhs, rhs) {
        (VadActivity::Active, _) | (_, VadActivity::Active) => VadActivity::Active,
        (VadActivity::Unknown, _) | (_, VadActivity::Unknown) => VadActivity::Unknown,
        _ => VadActivity::Passive,
    }
}

#[inline]
fn clamp_to_i16(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono(samples: &[i16]) -> AudioFrame {
        let mut frame = AudioFrame::new();
        frame
            .update_frame(
                0,
                0,
                Some(samples),
                samples.len(),
                8000,
                SpeechType::NormalSpeech,
                VadActivity::Active,
                1,
            )
            .unwrap();
        frame
    }

    #[test]
    fn new_frame_is_reset() {
        let frame = AudioFrame::new();
        assert_eq!(frame.id, -1);
        assert_eq!(frame.elapsed_time_ms, -1);
        assert_eq!(frame.ntp_time_ms, -1);
        assert_eq!(frame.num_channels(), 0);
        assert_eq!(frame.speech_type, SpeechType::Undefined);
        assert_eq!(frame.vad_activity, VadActivity::Unknown);
        assert!(frame.is_empty());
    }

    #[test]
    fn reset_keeps_buffer_bytes() {
        let mut frame = mono(&[1, 2, 3]);
        frame.reset();
        assert!(frame.data().is_empty());
        assert_eq!(&frame.raw_mut()[..3], &[1, 2, 3]);
    }

    #[test]
    fn update_frame_rejects_overflow() {
        let mut frame = mono(&[7; 4]);
        let err = frame
            .update_frame(
                1,
                0,
                None,
                1921,
                32000,
                SpeechType::NormalSpeech,
                VadActivity::Active,
                2,
            )
            .unwrap_err();
        assert_eq!(err, MixerError::BufferOverflow { required: 3842, capacity: 3840 });
        assert_eq!(frame.id, 0);
        assert_eq!(frame.data(), &[7; 4]);
    }

    #[test]
    fn update_frame_rejects_short_source() {
        let mut frame = AudioFrame::new();
        let samples = [1, 2];
        let err = frame
            .update_frame(0, 0, Some(&samples[..]), 2, 8000, SpeechType::Plc, VadActivity::Passive, 2)
            .unwrap_err();
        assert_eq!(err, MixerError::SourceTooShort { required: 4, provided: 2 });
    }

    #[test]
    fn update_frame_without_data_zero_fills() {
        let mut frame = mono(&[9; 10]);
        frame
            .update_frame(3, 160, None, 5, 16000, SpeechType::Cng, VadActivity::Passive, 2)
            .unwrap();
        assert_eq!(frame.data(), &[0; 10]);
        assert_eq!(frame.timestamp, 160);
        assert_eq!(frame.duration_ms(), 0);
    }

    #[test]
    fn copy_from_copies_metadata_and_samples() {
        let mut src = mono(&[1, -2, 3]);
        src.elapsed_time_ms = 42;
        src.ntp_time_ms = 1234;
        let mut dst = AudioFrame::new();
        dst.copy_from(&src);
        assert_eq!(dst.data(), &[1, -2, 3]);
        assert_eq!(dst.elapsed_time_ms, 42);
        assert_eq!(dst.ntp_time_ms, 1234);
        assert_eq!(dst.sample_rate_hz, 8000);
        assert_eq!(dst.vad_activity, VadActivity::Active);
    }

    #[test]
    fn mute_keeps_metadata() {
        let mut frame = mono(&[5, 6]);
        frame.mute();
        assert_eq!(frame.data(), &[0, 0]);
        assert_eq!(frame.samples_per_channel(), 2);
        assert_eq!(frame.speech_type, SpeechType::NormalSpeech);
    }

    #[test]
    fn attenuate_is_arithmetic_shift() {
        let mut frame = mono(&[-4, 5, -5, i16::MIN]);
        frame.attenuate(1);
        assert_eq!(frame.data(), &[-2, 2, -3, -16384]);

        frame.attenuate(40);
        assert_eq!(frame.data(), &[-1, 0, -1, -1]);
    }

    #[test]
    fn attenuate_ignores_unsupported_layout() {
        let mut frame = AudioFrame::new();
        let samples = [8, 8, 8];
        frame
            .update_frame(
                0,
                0,
                Some(&samples[..]),
                1,
                8000,
                SpeechType::NormalSpeech,
                VadActivity::Active,
                3,
            )
            .unwrap();
        frame.attenuate(1);
        assert_eq!(frame.data(), &[8, 8, 8]);
    }

    #[test]
    fn accumulate_saturates() {
        let mut a = mono(&[30000, -30000, 100, i16::MAX]);
        let b = mono(&[20000, -20000, -50, i16::MAX]);
        assert_eq!(a.accumulate(&b), AccumulateOutcome::Mixed);
        assert_eq!(a.data(), &[32767, -32768, 50, 32767]);
    }

    #[test]
    fn accumulate_into_empty_copies() {
        let mut a = AudioFrame::new();
        a.update_frame(0, 0, None, 0, 8000, SpeechType::NormalSpeech, VadActivity::Passive, 1)
            .unwrap();
        let b = mono(&[100, -100, 200, -200]);
        assert_eq!(a.accumulate(&b), AccumulateOutcome::Copied);
        assert_eq!(a.data(), &[100, -100, 200, -200]);
        assert_eq!(a.vad_activity, VadActivity::Active);
    }

    #[test]
    fn accumulate_skips_channel_mismatch() {
        let mut a = mono(&[1, 2]);
        let mut b = AudioFrame::new();
        let samples = [5; 4];
        b.update_frame(0, 0, Some(&samples[..]), 2, 8000, SpeechType::Cng, VadActivity::Passive, 2)
            .unwrap();
        assert_eq!(a.accumulate(&b), AccumulateOutcome::Skipped(SkipReason::ChannelMismatch));
        assert_eq!(a.data(), &[1, 2]);
        assert_eq!(a.speech_type, SpeechType::NormalSpeech);
    }

    #[test]
    fn accumulate_skips_length_mismatch() {
        let mut a = mono(&[1, 2, 3]);
        let b = mono(&[1, 2]);
        assert_eq!(a.accumulate(&b), AccumulateOutcome::Skipped(SkipReason::LengthMismatch));
        assert_eq!(a.data(), &[1, 2, 3]);
    }

    #[test]
    fn accumulate_skips_reset_frame() {
        let mut a = AudioFrame::new();
        let b = mono(&[1, 2]);
        assert_eq!(a.accumulate(&b), AccumulateOutcome::Skipped(SkipReason::UnsupportedChannels));
        assert!(a.is_empty());
    }

    #[test]
    fn vad_merge() {
        use VadActivity::*;
        assert_eq!(merge_vad(Active, Passive), Active);
        assert_eq!(merge_vad(Passive, Active), Active);
        assert_eq!(merge_vad(Unknown, Active), Active);
        assert_eq!(merge_vad(Unknown, Passive), Unknown);
        assert_eq!(merge_vad(Passive, Unknown), Unknown);
        assert_eq!(merge_vad(Passive, Passive), Passive);
    }

    #[test]
    fn speech_type_merge() {
        let mut a = mono(&[0; 4]);
        let mut b = mono(&[0; 4]);
        a.accumulate(&b);
        assert_eq!(a.speech_type, SpeechType::NormalSpeech);

        b.speech_type = SpeechType::Cng;
        a.accumulate(&b);
        assert_eq!(a.speech_type, SpeechType::Undefined);
    }
}
