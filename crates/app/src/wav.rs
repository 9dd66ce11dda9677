//! WAV decoding, the app's stand-in for a platform audio decoder.

use std::path::Path;

use audio_canvas_core::{AudioBuffer, AudioCanvasError, Result};

/// Decodes a whole WAV file into planar `f32` channels in `[-1, 1]`.
pub fn load_wav(path: &Path) -> Result<AudioBuffer> {
    let mut reader = hound::WavReader::open(path).map_err(decode_error)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(decode_error)?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|value| value as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(decode_error)?
        }
    };

    let buffer = AudioBuffer::from_interleaved(spec.sample_rate, usize::from(spec.channels), &samples)?;
    tracing::debug!(
        ?path,
        sample_rate = spec.sample_rate,
        channels = spec.channels,
        seconds = buffer.duration(),
        "decoded audio"
    );
    Ok(buffer)
}

fn decode_error(err: hound::Error) -> AudioCanvasError {
    AudioCanvasError::msg(format!("failed to decode WAV: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_interleaved_pcm() {
        let path = std::env::temp_dir().join(format!("audio-canvas-{}.wav", std::process::id()));
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..4_000 {
            writer.write_sample(16_384_i16).unwrap();
            writer.write_sample(-16_384_i16).unwrap();
        }
        writer.finalize().unwrap();

        let buffer = load_wav(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(buffer.number_of_channels(), 2);
        assert_eq!(buffer.len(), 4_000);
        assert_eq!(buffer.duration(), 0.5);
        assert_eq!(buffer.channel_data(0).unwrap()[0], 0.5);
        assert_eq!(buffer.channel_data(1).unwrap()[0], -0.5);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_wav(Path::new("/definitely/not/here.wav")).is_err());
    }
}
