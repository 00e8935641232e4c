//! Audio duration extraction.

use std::path::Path;

use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::probe::Hint;

/// Reads the playing time of an audio file.
pub trait DurationProbe: Send + Sync {
    /// Returns the duration in seconds, or None if the file cannot be read.
    fn duration_seconds(&self, path: &Path) -> Option<f64>;
}

/// Duration probe reading container headers with symphonia.
///
/// When the container does not declare a frame count (VBR MP3 without a
/// Xing/Info header), the packets are walked and their durations summed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaProbe;

impl DurationProbe for SymphoniaProbe {
    fn duration_seconds(&self, path: &Path) -> Option<f64> {
        let file = std::fs::File::open(path).ok()?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &Default::default(), &Default::default())
            .ok()?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)?;
        let track_id = track.id;
        let time_base = track.codec_params.time_base?;
        let n_frames = track.codec_params.n_frames;

        let frames = match n_frames {
            Some(n) => n,
            None => {
                log::debug!("[Catalog] No frame count in {}, scanning packets", path.display());
                let mut total = 0u64;
                loop {
                    match format.next_packet() {
                        Ok(packet) if packet.track_id() == track_id => total += packet.dur,
                        Ok(_) => {}
                        Err(SymphoniaError::IoError(e))
                            if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                        {
                            break
                        }
                        Err(_) => return None,
                    }
                }
                total
            }
        };

        let time = time_base.calc_time(frames);
        let seconds = time.seconds as f64 + time.frac;
        (seconds > 0.0).then_some(seconds)
    }
}
