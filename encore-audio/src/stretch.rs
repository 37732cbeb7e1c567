//! Time-scale/pitch transform - independent tempo and pitch over a PCM stream
//!
//! Classic two-stage time-domain design: an overlap-add stretcher with a
//! correlation seek (WSOLA) changes duration without changing pitch, then a
//! linear-interpolation transposer resamples the stretched signal to move
//! pitch. Combining the two stages gives independent control of both axes:
//!
//! - stretch ratio = tempo / pitch (applied by overlap-add)
//! - transpose ratio = pitch (applied by resampling)
//!
//! so overall playback speed is `tempo` and transposition is `pitch`.
//! At the default settings the transform is an exact passthrough.

use crate::session::{PITCH_CEILING, PITCH_FLOOR, TEMPO_CEILING, TEMPO_FLOOR};
use crate::source::TrackSource;

/// Analysis sequence length in milliseconds
const SEQUENCE_MS: u32 = 40;
/// Correlation seek window in milliseconds
const SEEK_WINDOW_MS: u32 = 15;
/// Crossfade overlap in milliseconds
const OVERLAP_MS: u32 = 8;
/// Frames pulled from the source per refill
const FEED_FRAMES: usize = 1024;

/// Pitch/tempo transform over interleaved stereo samples.
///
/// Pull-based: `pull` drains buffered output and feeds itself from the
/// source as needed. Parameter changes take effect on the next pull with no
/// ramping. Position is always reported by the source in untransformed
/// frames; this stage only changes how fast those frames are consumed.
pub struct TimeStretcher {
    /// Playback speed ratio, 1.0 = original
    tempo: f32,
    /// Transposition ratio, 2^(semitones/12)
    pitch: f32,
    seq_frames: usize,
    seek_frames: usize,
    overlap_frames: usize,
    /// Interleaved input FIFO awaiting overlap-add
    input: Vec<f32>,
    /// Interleaved stretched output awaiting transposition
    stretched: Vec<f32>,
    /// Tail of the previous sequence, crossfaded into the next one
    prev_overlap: Vec<f32>,
    have_overlap: bool,
    /// Fractional part of the input skip carried between sequences
    skip_fract: f64,
    /// Fractional read position of the transposer into `stretched`
    transpose_pos: f64,
    /// Scratch buffer for source refills (no allocation on the audio path)
    feed_buf: Vec<f32>,
}

impl TimeStretcher {
    pub fn new(sample_rate: u32) -> Self {
        let frames_for = |ms: u32| ((sample_rate as u64 * ms as u64) / 1000).max(8) as usize;
        let overlap_frames = frames_for(OVERLAP_MS);
        Self {
            tempo: 1.0,
            pitch: 1.0,
            seq_frames: frames_for(SEQUENCE_MS),
            seek_frames: frames_for(SEEK_WINDOW_MS),
            overlap_frames,
            input: Vec::new(),
            stretched: Vec::new(),
            prev_overlap: vec![0.0; overlap_frames * 2],
            have_overlap: false,
            skip_fract: 0.0,
            transpose_pos: 0.0,
            feed_buf: vec![0.0; FEED_FRAMES * 2],
        }
    }

    /// Set tempo as a percentage of original speed, clamped to the hard limits
    pub fn set_tempo_percent(&mut self, percent: f32) {
        self.tempo = percent.clamp(TEMPO_FLOOR, TEMPO_CEILING) / 100.0;
    }

    /// Set transposition in semitones, clamped to the hard limits
    pub fn set_pitch_semitones(&mut self, semitones: i32) {
        let semitones = semitones.clamp(PITCH_FLOOR, PITCH_CEILING);
        self.pitch = 2.0f32.powf(semitones as f32 / 12.0);
    }

    /// Ratio applied by the overlap-add stage
    fn stretch_ratio(&self) -> f64 {
        self.tempo as f64 / self.pitch as f64
    }

    fn is_passthrough(&self) -> bool {
        self.tempo == 1.0 && self.pitch == 1.0
    }

    /// Discard all buffered state, e.g. after a seek
    pub fn reset(&mut self) {
        self.input.clear();
        self.stretched.clear();
        self.have_overlap = false;
        self.skip_fract = 0.0;
        self.transpose_pos = 0.0;
    }

    /// Whether everything buffered has been emitted
    pub fn is_drained(&self) -> bool {
        self.input.is_empty() && self.stretched.len() / 2 <= 1
    }

    /// Fill `out` with transformed frames pulled from `source`.
    /// Returns frames written; fewer than requested means end of stream.
    pub fn pull(&mut self, source: &mut TrackSource, out: &mut [f32]) -> usize {
        let want = out.len() / 2;

        // Unity settings with nothing buffered: read straight through
        if self.is_passthrough() && self.input.is_empty() && self.stretched.len() / 2 <= 1 {
            self.stretched.clear();
            return source.read(out);
        }

        let mut produced = 0;

        while produced < want {
            produced += self.transpose_into(&mut out[produced * 2..want * 2]);
            if produced >= want {
                break;
            }

            if self.process_sequences() {
                continue;
            }

            let Self {
                input, feed_buf, ..
            } = self;
            let fed = source.read(feed_buf);
            if fed > 0 {
                input.extend_from_slice(&feed_buf[..fed * 2]);
                continue;
            }

            // Source exhausted: emit the sub-sequence tail unstretched
            if !self.input.is_empty() {
                let tail = std::mem::take(&mut self.input);
                self.stretched.extend_from_slice(&tail);
                continue;
            }
            break;
        }

        produced
    }

    /// Run as many overlap-add sequences as buffered input allows.
    /// Each sequence emits `seq - overlap` frames and consumes roughly
    /// `(seq - overlap) * stretch_ratio` input frames.
    fn process_sequences(&mut self) -> bool {
        let seq = self.seq_frames;
        let overlap = self.overlap_frames;
        let hop = seq - overlap;
        // The window must hold the seek range plus one sequence, and at
        // high ratios also the full nominal skip consumed per sequence
        let skip = (hop as f64 * self.stretch_ratio()).ceil() as usize + 1;
        let needed = (self.seek_frames + seq).max(skip);
        let mut any = false;

        while self.input.len() / 2 >= needed {
            let offset = if self.have_overlap {
                self.best_offset()
            } else {
                0
            };

            if self.have_overlap {
                // Crossfade the saved tail into the chosen window
                for i in 0..overlap {
                    let t = i as f32 / overlap as f32;
                    let j = (offset + i) * 2;
                    self.stretched
                        .push(self.prev_overlap[i * 2] * (1.0 - t) + self.input[j] * t);
                    self.stretched
                        .push(self.prev_overlap[i * 2 + 1] * (1.0 - t) + self.input[j + 1] * t);
                }
            } else {
                let start = offset * 2;
                self.stretched
                    .extend_from_slice(&self.input[start..start + overlap * 2]);
            }

            // Steady region after the crossfade
            let start = (offset + overlap) * 2;
            self.stretched
                .extend_from_slice(&self.input[start..(offset + hop) * 2]);

            // Save the next crossfade tail
            let start = (offset + hop) * 2;
            self.prev_overlap
                .copy_from_slice(&self.input[start..(offset + seq) * 2]);
            self.have_overlap = true;

            // Advance the input by the nominal skip for this ratio
            self.skip_fract += hop as f64 * self.stretch_ratio();
            let drain = (self.skip_fract.floor() as usize).min(self.input.len() / 2);
            self.skip_fract -= drain as f64;
            self.input.drain(..drain * 2);

            any = true;
        }

        any
    }

    /// Find the window offset whose overlap best matches the saved tail,
    /// using a normalized correlation over the mono mix.
    fn best_offset(&self) -> usize {
        let overlap = self.overlap_frames;
        let mut best = 0;
        let mut best_corr = f32::MIN;

        for offset in 0..self.seek_frames {
            let mut corr = 0.0f32;
            let mut norm = 0.0f32;
            for i in 0..overlap {
                let j = (offset + i) * 2;
                let m = self.input[j] + self.input[j + 1];
                let p = self.prev_overlap[i * 2] + self.prev_overlap[i * 2 + 1];
                corr += m * p;
                norm += m * m;
            }
            let score = if norm > 1e-9 { corr / norm.sqrt() } else { corr };
            if score > best_corr {
                best_corr = score;
                best = offset;
            }
        }

        best
    }

    /// Emit frames from the stretched buffer through the transposer.
    /// Consumes `pitch` stretched frames per output frame.
    fn transpose_into(&mut self, out: &mut [f32]) -> usize {
        let want = out.len() / 2;
        let avail = self.stretched.len() / 2;
        if want == 0 || avail == 0 {
            return 0;
        }

        if self.pitch == 1.0 && self.transpose_pos == 0.0 {
            let frames = want.min(avail);
            out[..frames * 2].copy_from_slice(&self.stretched[..frames * 2]);
            self.stretched.drain(..frames * 2);
            return frames;
        }

        let mut written = 0;
        while written < want {
            let idx = self.transpose_pos.floor() as usize;
            if idx + 1 >= avail {
                break;
            }
            let frac = (self.transpose_pos - idx as f64) as f32;
            let l0 = self.stretched[idx * 2];
            let r0 = self.stretched[idx * 2 + 1];
            let l1 = self.stretched[(idx + 1) * 2];
            let r1 = self.stretched[(idx + 1) * 2 + 1];
            out[written * 2] = l0 + frac * (l1 - l0);
            out[written * 2 + 1] = r0 + frac * (r1 - r0);
            written += 1;
            self.transpose_pos += self.pitch as f64;
        }

        let used = (self.transpose_pos.floor() as usize).min(avail.saturating_sub(1));
        self.stretched.drain(..used * 2);
        self.transpose_pos -= used as f64;

        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_source(frames: usize, rate: u32) -> TrackSource {
        let mut samples = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            let phase = i as f32 * 220.0 * 2.0 * std::f32::consts::PI / rate as f32;
            let s = phase.sin() * 0.5;
            samples.push(s);
            samples.push(s);
        }
        TrackSource::from_samples(samples, rate)
    }

    fn drain_all(stretcher: &mut TimeStretcher, source: &mut TrackSource) -> usize {
        let mut out = vec![0.0f32; 512 * 2];
        let mut total = 0;
        loop {
            let n = stretcher.pull(source, &mut out);
            total += n;
            if n == 0 {
                break;
            }
        }
        total
    }

    #[test]
    fn default_settings_pass_through_unchanged() {
        let mut source = sine_source(4096, 48_000);
        let expected: Vec<f32> = {
            let mut buf = vec![0.0f32; 4096 * 2];
            source.read(&mut buf);
            source.seek_to_frame(0);
            buf
        };

        let mut stretcher = TimeStretcher::new(48_000);
        let mut out = vec![0.0f32; 4096 * 2];
        let frames = stretcher.pull(&mut source, &mut out);

        assert_eq!(frames, 4096);
        assert_eq!(out, expected);
        assert!(source.is_exhausted());
    }

    #[test]
    fn double_tempo_roughly_halves_output_length() {
        let frames = 48_000;
        let mut source = sine_source(frames, 48_000);
        let mut stretcher = TimeStretcher::new(48_000);
        stretcher.set_tempo_percent(200.0);

        let produced = drain_all(&mut stretcher, &mut source);
        let expected = frames / 2;
        let slack = expected / 5;
        assert!(
            (produced as i64 - expected as i64).unsigned_abs() as usize <= slack,
            "expected ~{} frames, produced {}",
            expected,
            produced
        );
    }

    #[test]
    fn half_tempo_roughly_doubles_output_length() {
        let frames = 24_000;
        let mut source = sine_source(frames, 48_000);
        let mut stretcher = TimeStretcher::new(48_000);
        stretcher.set_tempo_percent(50.0);

        let produced = drain_all(&mut stretcher, &mut source);
        let expected = frames * 2;
        let slack = expected / 5;
        assert!(
            (produced as i64 - expected as i64).unsigned_abs() as usize <= slack,
            "expected ~{} frames, produced {}",
            expected,
            produced
        );
    }

    #[test]
    fn pitch_shift_preserves_duration() {
        let frames = 48_000;
        let mut source = sine_source(frames, 48_000);
        let mut stretcher = TimeStretcher::new(48_000);
        stretcher.set_pitch_semitones(7);

        let produced = drain_all(&mut stretcher, &mut source);
        let slack = frames / 5;
        assert!(
            (produced as i64 - frames as i64).unsigned_abs() as usize <= slack,
            "expected ~{} frames, produced {}",
            frames,
            produced
        );
    }

    #[test]
    fn parameters_clamp_to_hard_limits() {
        let mut stretcher = TimeStretcher::new(48_000);

        stretcher.set_pitch_semitones(24);
        assert!((stretcher.pitch - 2.0).abs() < 1e-4);
        stretcher.set_pitch_semitones(-24);
        assert!((stretcher.pitch - 0.5).abs() < 1e-4);

        stretcher.set_tempo_percent(500.0);
        assert!((stretcher.tempo - 2.0).abs() < 1e-6);
        stretcher.set_tempo_percent(0.0);
        assert!((stretcher.tempo - 0.5).abs() < 1e-6);
    }

    #[test]
    fn reset_discards_buffered_audio() {
        let mut source = sine_source(48_000, 48_000);
        let mut stretcher = TimeStretcher::new(48_000);
        stretcher.set_tempo_percent(150.0);

        let mut out = vec![0.0f32; 512 * 2];
        stretcher.pull(&mut source, &mut out);
        assert!(!stretcher.is_drained());

        stretcher.reset();
        assert!(stretcher.is_drained());
    }
}
