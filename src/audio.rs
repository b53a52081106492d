/*
 * @file audio.rs
 * @brief Microphone recording with a bounded listen window
 * @author Kevin Thomas
 * @date 2025
 *
 * MIT License
 *
 * Copyright (c) 2025 Kevin Thomas
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! Audio recording functionality.
//!
//! This module handles microphone input using CPAL and WAV encoding with
//! hound. A listen is bounded twice: speech must start within the listen
//! timeout, and the phrase is cut at the phrase limit.

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig, StreamError};
use hound::{WavSpec, WavWriter};
use tracing::{debug, warn};

use crate::error::AssistantError;

/// Sample rate for audio recording (16kHz).
///
/// Value is expressed in Hertz and matches Whisper's preferred input rate.
const SAMPLE_RATE: u32 = 16000;

/// Number of audio channels (mono).
const CHANNELS: u16 = 1;

/// Bits per sample for WAV encoding.
const BITS_PER_SAMPLE: u16 = 16;

/// Minimum RMS amplitude considered speech.
const SILENCE_RMS_THRESHOLD: f32 = 150.0;

/// How often the recorder inspects the newest audio.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Trailing silence that ends a phrase early.
const PAUSE_THRESHOLD: Duration = Duration::from_millis(800);

/// Lists the names of all input devices, in index order.
///
/// # Errors
/// Returns [`AssistantError::DeviceUnavailable`] if the host cannot enumerate devices.
pub fn input_device_names() -> Result<Vec<String>, AssistantError> {
    let devices = cpal::default_host()
        .input_devices()
        .map_err(|e| AssistantError::DeviceUnavailable(e.to_string()))?;
    Ok(devices
        .enumerate()
        .map(|(i, device)| device.name().unwrap_or_else(|_| format!("input {}", i)))
        .collect())
}

/// Index of the system default input device within [`input_device_names`].
pub fn default_input_index() -> Option<usize> {
    let host = cpal::default_host();
    let default_name = host.default_input_device()?.name().ok()?;
    input_device_names()
        .ok()?
        .iter()
        .position(|name| *name == default_name)
}

/// Records one phrase from the input device at `index`.
///
/// # Details
/// Waits up to `timeout` for speech energy, then records until the speaker
/// pauses or `phrase_limit` elapses. Blocks the calling thread throughout.
///
/// # Arguments
/// * `index` - Device position as reported by [`input_device_names`].
/// * `timeout` - Longest wait for speech to begin.
/// * `phrase_limit` - Longest phrase once speech has begun.
///
/// # Returns
/// A vector of 16-bit PCM audio samples.
///
/// # Errors
/// * [`AssistantError::DeviceUnavailable`] - Missing device or stream failure.
/// * [`AssistantError::AcquisitionTimeout`] - Nothing was said in time.
pub fn record_phrase(
    index: usize,
    timeout: Duration,
    phrase_limit: Duration,
) -> Result<Vec<i16>, AssistantError> {
    let device = input_device(index)?;
    let samples = shared_samples();
    let stream = build_input_stream(&device, &input_config(), samples.clone())
        .map_err(|e| AssistantError::DeviceUnavailable(e.to_string()))?;
    stream
        .play()
        .map_err(|e| AssistantError::DeviceUnavailable(e.to_string()))?;
    debug!(index, "listening");

    let started = Instant::now();
    let mut speech_began: Option<Instant> = None;
    let mut last_voice = started;
    loop {
        std::thread::sleep(POLL_INTERVAL);
        let now = Instant::now();
        if recent_has_speech(&samples) {
            last_voice = now;
            speech_began.get_or_insert(now);
        }
        match speech_began {
            None if now.duration_since(started) >= timeout => {
                return Err(AssistantError::AcquisitionTimeout(timeout));
            }
            Some(began) if now.duration_since(began) >= phrase_limit => break,
            Some(_) if now.duration_since(last_voice) >= PAUSE_THRESHOLD => break,
            _ => {}
        }
    }
    drop(stream);
    let captured = samples.lock().map(|guard| guard.clone()).unwrap_or_default();
    Ok(captured)
}

/// Encodes samples as an in-memory 16 kHz mono WAV file.
///
/// # Errors
/// Returns an error if the WAV writer fails.
pub fn encode_wav(samples: &[i16]) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: CHANNELS,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    };

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut buffer, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(buffer.into_inner())
}

/// Detects whether audio samples contain meaningful speech content.
///
/// # Details
/// Calculates the root mean square (RMS) energy of the signal and compares
/// it against [`SILENCE_RMS_THRESHOLD`].
pub fn contains_speech(samples: &[i16]) -> bool {
    if samples.is_empty() {
        return false;
    }
    let energy = samples
        .iter()
        .map(|sample| (*sample as f32).powi(2))
        .sum::<f32>()
        / samples.len() as f32;
    energy.sqrt() >= SILENCE_RMS_THRESHOLD
}

/// Whether the newest poll interval of audio holds speech.
fn recent_has_speech(samples: &Arc<Mutex<Vec<i16>>>) -> bool {
    let window = (SAMPLE_RATE as u128 * POLL_INTERVAL.as_millis() / 1000) as usize;
    match samples.lock() {
        Ok(guard) => {
            let start = guard.len().saturating_sub(window);
            contains_speech(&guard[start..])
        }
        Err(_) => false,
    }
}

fn input_device(index: usize) -> Result<Device, AssistantError> {
    cpal::default_host()
        .input_devices()
        .map_err(|e| AssistantError::DeviceUnavailable(e.to_string()))?
        .nth(index)
        .ok_or_else(|| AssistantError::DeviceUnavailable(format!("no input device {}", index)))
}

/// Builds the CPAL stream configuration used by the recorder.
fn input_config() -> StreamConfig {
    StreamConfig {
        channels: CHANNELS,
        sample_rate: cpal::SampleRate(SAMPLE_RATE),
        buffer_size: cpal::BufferSize::Default,
    }
}

/// Creates the shared buffer that accumulates captured samples.
fn shared_samples() -> Arc<Mutex<Vec<i16>>> {
    Arc::new(Mutex::new(Vec::new()))
}

/// Builds and configures the CPAL input stream.
///
/// # Parameters
/// * `device` - The input device to capture from.
/// * `config` - The stream configuration (channels/rate/buffer).
/// * `samples` - Shared buffer that receives converted samples.
fn build_input_stream(
    device: &Device,
    config: &StreamConfig,
    samples: Arc<Mutex<Vec<i16>>>,
) -> Result<Stream> {
    device
        .build_input_stream(
            config,
            move |data: &[f32], _: &_| push_samples(&samples, data),
            log_stream_error,
            None,
        )
        .map_err(|err| anyhow::anyhow!(err))
}

/// Converts floating-point frames into 16-bit PCM and appends them to the buffer.
fn push_samples(buffer: &Arc<Mutex<Vec<i16>>>, data: &[f32]) {
    if let Ok(mut guard) = buffer.lock() {
        for &sample in data {
            guard.push((sample * i16::MAX as f32) as i16);
        }
    }
}

fn log_stream_error(error: StreamError) {
    warn!(error = %error, "audio stream error");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_config_matches_constants() {
        let config = input_config();
        assert_eq!(config.channels, CHANNELS);
        assert_eq!(config.sample_rate.0, SAMPLE_RATE);
    }

    #[test]
    fn push_samples_converts_floats() {
        let samples = shared_samples();
        push_samples(&samples, &[0.0, 0.5, -1.0]);
        let guard = samples.lock().unwrap();
        assert_eq!(guard.len(), 3);
        assert_eq!(guard[0], 0);
        assert!(guard[1] > 0);
        assert!(guard[2] < 0);
    }

    #[test]
    fn contains_speech_requires_energy() {
        assert!(!contains_speech(&[]));
        assert!(!contains_speech(&[0_i16; 1600]));
        assert!(contains_speech(&vec![i16::MAX / 2; 1600]));
    }

    #[test]
    fn recent_window_ignores_old_speech() {
        let samples = shared_samples();
        samples.lock().unwrap().extend(vec![i16::MAX / 2; 1600]);
        assert!(recent_has_speech(&samples));
        samples.lock().unwrap().extend(vec![0_i16; 1600]);
        assert!(!recent_has_speech(&samples));
    }

    #[test]
    fn encode_wav_round_trips_samples() {
        let samples = vec![0_i16, i16::MAX / 2, -i16::MAX / 2];
        let bytes = encode_wav(&samples).expect("encode wav");
        assert_eq!(&bytes[..4], b"RIFF");
        let reader = hound::WavReader::new(Cursor::new(bytes)).expect("read wav");
        assert_eq!(reader.spec().sample_rate, SAMPLE_RATE);
        let decoded: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, samples);
    }
}
