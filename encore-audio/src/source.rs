//! Decoder/source adapter - seekable PCM stream decoded with Symphonia

use std::path::Path;
use std::sync::Arc;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while opening a source file
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No audio track found in file")]
    NoAudioTrack,
    #[error("Decode error: {0}")]
    Decode(String),
}

/// A fully decoded track: interleaved stereo f32 at the engine sample rate
pub struct DecodedTrack {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedTrack {
    pub fn total_frames(&self) -> u64 {
        (self.samples.len() / 2) as u64
    }
}

/// Seekable, resettable view over a decoded track.
///
/// Positions are in frames of the *untransformed* stream; the transform
/// downstream pulls from here and never changes what a frame index means.
pub struct TrackSource {
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
    /// Current read position in frames
    pos: usize,
}

impl TrackSource {
    pub fn new(track: DecodedTrack) -> Self {
        Self {
            samples: Arc::new(track.samples),
            sample_rate: track.sample_rate,
            pos: 0,
        }
    }

    /// Build a source directly from interleaved stereo samples
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: Arc::new(samples),
            sample_rate,
            pos: 0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn total_frames(&self) -> u64 {
        (self.samples.len() / 2) as u64
    }

    pub fn position_frames(&self) -> u64 {
        self.pos as u64
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos * 2 >= self.samples.len()
    }

    /// Reposition the read cursor, clamped to the stream bounds
    pub fn seek_to_frame(&mut self, frame: u64) {
        let total = self.samples.len() / 2;
        self.pos = (frame as usize).min(total);
    }

    /// Copy up to `out.len() / 2` frames into `out`, returning frames copied
    pub fn read(&mut self, out: &mut [f32]) -> usize {
        let total = self.samples.len() / 2;
        let want = out.len() / 2;
        let frames = want.min(total - self.pos.min(total));
        let start = self.pos * 2;
        out[..frames * 2].copy_from_slice(&self.samples[start..start + frames * 2]);
        self.pos += frames;
        frames
    }
}

/// Audio file loader using Symphonia, resampling to a target rate with rubato
pub struct TrackLoader {
    target_sample_rate: u32,
}

impl Default for TrackLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackLoader {
    /// Create a new track loader with default 48kHz sample rate
    pub fn new() -> Self {
        Self::with_sample_rate(48000)
    }

    /// Create a new track loader with specific sample rate
    pub fn with_sample_rate(target_sample_rate: u32) -> Self {
        Self { target_sample_rate }
    }

    /// Load and decode an audio file to interleaved stereo at the target rate
    pub fn load(&self, path: &Path) -> Result<DecodedTrack, LoadError> {
        let file = std::fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Format selection is driven by the file extension
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| LoadError::Decode(e.to_string()))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(LoadError::NoAudioTrack)?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let source_sample_rate = codec_params.sample_rate.unwrap_or(44100);
        let channels = codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(2);

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| LoadError::Decode(e.to_string()))?;

        let mut samples: Vec<f32> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(symphonia::core::errors::Error::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(_) => break,
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(_) => continue,
            };

            let spec = *decoded.spec();
            let duration = decoded.capacity() as u64;

            let mut sample_buf = SampleBuffer::<f32>::new(duration, spec);
            sample_buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(sample_buf.samples());
        }

        if samples.is_empty() {
            return Err(LoadError::NoAudioTrack);
        }

        let samples = to_stereo(&samples, channels);

        let samples = if source_sample_rate != self.target_sample_rate {
            self.resample(&samples, source_sample_rate)?
        } else {
            samples
        };

        debug!(
            path = %path.display(),
            frames = samples.len() / 2,
            rate = self.target_sample_rate,
            "decoded track"
        );

        Ok(DecodedTrack {
            samples,
            sample_rate: self.target_sample_rate,
        })
    }

    /// Resample interleaved stereo audio to the target sample rate
    fn resample(&self, samples: &[f32], source_rate: u32) -> Result<Vec<f32>, LoadError> {
        use rubato::{FftFixedInOut, Resampler};

        let frames = samples.len() / 2;

        let mut resampler = FftFixedInOut::<f32>::new(
            source_rate as usize,
            self.target_sample_rate as usize,
            1024,
            2,
        )
        .map_err(|e| LoadError::Decode(e.to_string()))?;

        // Deinterleave
        let deinterleaved: Vec<Vec<f32>> = (0..2)
            .map(|ch| (0..frames).map(|f| samples[f * 2 + ch]).collect())
            .collect();

        let chunk_size = resampler.input_frames_next();
        let mut output: Vec<Vec<f32>> = vec![Vec::new(); 2];

        let mut pos = 0;
        while pos + chunk_size <= frames {
            let input_refs: Vec<&[f32]> = deinterleaved
                .iter()
                .map(|ch| &ch[pos..pos + chunk_size])
                .collect();

            let resampled = resampler
                .process(&input_refs, None)
                .map_err(|e| LoadError::Decode(e.to_string()))?;

            for (ch, data) in resampled.into_iter().enumerate() {
                output[ch].extend(data);
            }

            pos += chunk_size;
        }

        // Remaining partial chunk, zero-padded
        if pos < frames {
            let remaining = frames - pos;
            let padded: Vec<Vec<f32>> = deinterleaved
                .iter()
                .map(|ch| {
                    let mut v = ch[pos..].to_vec();
                    v.resize(chunk_size, 0.0);
                    v
                })
                .collect();

            let input_refs: Vec<&[f32]> = padded.iter().map(|v| v.as_slice()).collect();

            if let Ok(resampled) = resampler.process(&input_refs, None) {
                for (ch, data) in resampled.into_iter().enumerate() {
                    let output_frames =
                        (remaining * self.target_sample_rate as usize) / source_rate as usize;
                    output[ch].extend(&data[..output_frames.min(data.len())]);
                }
            }
        }

        // Reinterleave
        let output_frames = output[0].len();
        let mut interleaved = Vec::with_capacity(output_frames * 2);
        for frame_idx in 0..output_frames {
            interleaved.push(output[0][frame_idx]);
            interleaved.push(output[1][frame_idx]);
        }

        Ok(interleaved)
    }
}

/// Normalize any channel count to interleaved stereo.
/// Mono is duplicated; extra channels beyond the first two are dropped.
fn to_stereo(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        2 => samples.to_vec(),
        0 | 1 => {
            let mut out = Vec::with_capacity(samples.len() * 2);
            for &s in samples {
                out.push(s);
                out.push(s);
            }
            out
        }
        n => {
            let n = n as usize;
            let frames = samples.len() / n;
            let mut out = Vec::with_capacity(frames * 2);
            for f in 0..frames {
                out.push(samples[f * n]);
                out.push(samples[f * n + 1]);
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo_ramp(frames: usize) -> Vec<f32> {
        let mut v = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            v.push(i as f32);
            v.push(-(i as f32));
        }
        v
    }

    #[test]
    fn source_reads_and_seeks() {
        let mut source = TrackSource::from_samples(stereo_ramp(100), 48_000);
        assert_eq!(source.total_frames(), 100);

        let mut buf = vec![0.0f32; 40 * 2];
        assert_eq!(source.read(&mut buf), 40);
        assert_eq!(source.position_frames(), 40);
        assert_eq!(buf[0], 0.0);
        assert_eq!(buf[78], 39.0);

        source.seek_to_frame(95);
        assert_eq!(source.read(&mut buf), 5);
        assert!(source.is_exhausted());
        assert_eq!(source.read(&mut buf), 0);

        // Seek past the end clamps
        source.seek_to_frame(500);
        assert_eq!(source.position_frames(), 100);
    }

    #[test]
    fn mono_is_duplicated_to_stereo() {
        let stereo = to_stereo(&[0.1, 0.2, 0.3], 1);
        assert_eq!(stereo, vec![0.1, 0.1, 0.2, 0.2, 0.3, 0.3]);
    }

    #[test]
    fn surround_keeps_front_pair() {
        let stereo = to_stereo(&[1.0, 2.0, 9.0, 9.0, 3.0, 4.0, 9.0, 9.0], 4);
        assert_eq!(stereo, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn loader_round_trips_a_wav_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");

        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 48_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let frames = 4800;
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..frames {
            let phase = i as f32 * 440.0 * 2.0 * std::f32::consts::PI / 48_000.0;
            let sample = (phase.sin() * i16::MAX as f32 * 0.5) as i16;
            writer.write_sample(sample).unwrap();
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();

        let track = TrackLoader::with_sample_rate(48_000).load(&path).unwrap();
        assert_eq!(track.sample_rate, 48_000);
        assert_eq!(track.total_frames(), frames as u64);
    }

    #[test]
    fn loader_resamples_to_target_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone44.wav");

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let frames = 44_100; // one second
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..frames {
            let phase = i as f32 * 220.0 * 2.0 * std::f32::consts::PI / 44_100.0;
            writer
                .write_sample((phase.sin() * i16::MAX as f32 * 0.5) as i16)
                .unwrap();
        }
        writer.finalize().unwrap();

        let track = TrackLoader::with_sample_rate(48_000).load(&path).unwrap();
        assert_eq!(track.sample_rate, 48_000);
        // One second of audio, allow slack for resampler chunking at the tail
        let got = track.total_frames() as i64;
        assert!((got - 48_000).abs() < 2048, "got {} frames", got);
    }

    #[test]
    fn loader_reports_missing_file() {
        let result = TrackLoader::new().load(Path::new("/nonexistent/missing.mp3"));
        assert!(matches!(result, Err(LoadError::Io(_))));
    }
}
