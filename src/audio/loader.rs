//! WAV → [`AudioSample`] boundary helper.
//!
//! Stream-decodes with `hound`, scales integer PCM to `[-1, 1]` and downmixes
//! to mono. Anything fancier (other containers, codecs) belongs to the capture
//! collaborator.

use std::io::Read;
use std::path::Path;

use hound::{SampleFormat, WavReader};

use super::{AudioError, AudioSample};

/// Decode a WAV byte stream into a mono [`AudioSample`].
pub fn load_wav<R: Read>(reader: R) -> Result<AudioSample, AudioError> {
    let mut wav = WavReader::new(reader)?;
    let spec = wav.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => wav.samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            wav.samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    if interleaved.is_empty() {
        return Err(AudioError::Empty);
    }

    Ok(AudioSample::from_interleaved(
        &interleaved,
        spec.channels,
        spec.sample_rate,
    ))
}

/// Decode a WAV file from disk.
pub fn load_wav_file<P: AsRef<Path>>(path: P) -> Result<AudioSample, AudioError> {
    let file = std::fs::File::open(path).map_err(hound::Error::IoError)?;
    load_wav(std::io::BufReader::new(file))
}
