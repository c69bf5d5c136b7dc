/// Sound engine: background music plus procedural sound effects via rodio.
///
/// Music is an intro track followed by a second track that loops forever,
/// both queued on one Sink so the hand-over is gapless. Effects are
/// generated as in-memory WAV buffers at init time and played
/// fire-and-forget.
///
/// Compile with `--no-default-features` or without "sound" feature
/// to disable audio entirely (the stub SoundEngine does nothing).

#[cfg(feature = "sound")]
mod inner {
    use std::fs::File;
    use std::io::{BufReader, Cursor};
    use std::path::Path;
    use std::sync::Arc;

    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

    use crate::error::MediaError;

    pub(super) const SAMPLE_RATE: u32 = 22050;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        music: Option<Sink>,
        sfx_enabled: bool,
        sfx_flip: Arc<Vec<u8>>,
        sfx_match: Arc<Vec<u8>>,
        sfx_miss: Arc<Vec<u8>>,
        sfx_place: Arc<Vec<u8>>,
        sfx_candle: Arc<Vec<u8>>,
        sfx_fanfare: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new(sfx_enabled: bool) -> Result<Self, MediaError> {
            let (stream, handle) =
                OutputStream::try_default().map_err(|e| MediaError::NoDevice(e.to_string()))?;

            Ok(SoundEngine {
                _stream: stream,
                handle,
                music: None,
                sfx_enabled,
                sfx_flip: Arc::new(make_wav(&gen_flip())),
                sfx_match: Arc::new(make_wav(&gen_match())),
                sfx_miss: Arc::new(make_wav(&gen_miss())),
                sfx_place: Arc::new(make_wav(&gen_place())),
                sfx_candle: Arc::new(make_wav(&gen_candle())),
                sfx_fanfare: Arc::new(make_wav(&gen_fanfare())),
            })
        }

        /// Queue the intro, then the looping track. Calling again while
        /// music is already queued does nothing. A loop track that cannot be
        /// opened is logged and the intro plays on its own.
        pub fn start_music(&mut self, intro: &Path, looped: &Path) -> Result<(), MediaError> {
            if self.music.is_some() {
                return Ok(());
            }
            let (intro_src, loop_src) = open_music(intro, looped)?;
            let sink = Sink::try_new(&self.handle).map_err(|e| MediaError::NoDevice(e.to_string()))?;
            sink.append(intro_src);
            match loop_src {
                Some(src) => {
                    sink.append(src.repeat_infinite());
                    log::info!("music started: {} then {} (looped)", intro.display(), looped.display());
                }
                None => log::info!("music started: {} only", intro.display()),
            }
            self.music = Some(sink);
            Ok(())
        }

        /// Pause whichever music track is playing.
        pub fn pause_music(&self) {
            if let Some(sink) = &self.music {
                sink.pause();
            }
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            if !self.sfx_enabled {
                return;
            }
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }

        pub fn play_flip(&self) { self.play(&self.sfx_flip); }
        pub fn play_match(&self) { self.play(&self.sfx_match); }
        pub fn play_miss(&self) { self.play(&self.sfx_miss); }
        pub fn play_place(&self) { self.play(&self.sfx_place); }
        pub fn play_candle(&self) { self.play(&self.sfx_candle); }
        pub fn play_fanfare(&self) { self.play(&self.sfx_fanfare); }
    }

    type Track = Decoder<BufReader<File>>;

    /// Open both music tracks. Only the intro is required.
    pub(super) fn open_music(intro: &Path, looped: &Path) -> Result<(Track, Option<Track>), MediaError> {
        let intro_src = open_track(intro)?;
        let loop_src = match open_track(looped) {
            Ok(src) => Some(src),
            Err(e) => {
                log::warn!("{e}; the intro plays without a loop");
                None
            }
        };
        Ok((intro_src, loop_src))
    }

    fn open_track(path: &Path) -> Result<Track, MediaError> {
        let file = File::open(path).map_err(|source| MediaError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Decoder::new(BufReader::new(file)).map_err(|e| MediaError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn tone(freq: f32, i: usize) -> f32 {
        let t = i as f32 / SAMPLE_RATE as f32;
        (t * freq * 2.0 * std::f32::consts::PI).sin()
    }

    /// Card flip: short bright tick
    pub(super) fn gen_flip() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.04) as usize;
        (0..n)
            .map(|i| {
                let env = 1.0 - (i as f32 / n as f32);
                tone(900.0, i) * env * 0.2
            })
            .collect()
    }

    /// Pair found: rising two-note chime G5 → C6
    pub(super) fn gen_match() -> Vec<f32> {
        let pairs = [(784.0_f32, 0.07), (1047.0, 0.14)];
        let mut samples = Vec::new();
        for &(freq, dur) in &pairs {
            let n = (SAMPLE_RATE as f32 * dur) as usize;
            for i in 0..n {
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                let wave = tone(freq, i) * 0.7 + tone(freq * 2.0, i) * 0.3;
                samples.push(wave * env * 0.25);
            }
        }
        samples
    }

    /// Pair missed: soft falling whistle
    pub(super) fn gen_miss() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.15) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = 420.0 - t * 180.0;
                let ti = i as f32 / SAMPLE_RATE as f32;
                let env = (1.0 - t).powf(0.6);
                (ti * freq * 2.0 * std::f32::consts::PI).sin() * env * 0.2
            })
            .collect()
    }

    /// Piece dropped into place: low woody knock
    pub(super) fn gen_place() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.06) as usize;
        (0..n)
            .map(|i| {
                let env = (1.0 - i as f32 / n as f32).powf(2.0);
                (tone(220.0, i) * 0.8 + tone(660.0, i) * 0.2) * env * 0.3
            })
            .collect()
    }

    /// Candle blown out: breathy noise puff
    pub(super) fn gen_candle() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.25) as usize;
        let mut rng: u32 = 12345;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                // Quick swell then long fade
                let env = if t < 0.15 { t / 0.15 } else { (1.0 - t) / 0.85 };
                noise * env * 0.18
            })
            .collect()
    }

    /// Stage won: ascending fanfare with a held top note
    pub(super) fn gen_fanfare() -> Vec<f32> {
        let notes = [523.0_f32, 659.0, 784.0, 1047.0]; // C5→E5→G5→C6
        let mut samples = Vec::new();
        for &freq in &notes {
            let n = (SAMPLE_RATE as f32 * 0.1) as usize;
            for i in 0..n {
                let env = 1.0 - (i as f32 / n as f32) * 0.3;
                let wave = tone(freq, i) * 0.6 + tone(freq * 2.0, i) * 0.3 + tone(freq * 3.0, i) * 0.1;
                samples.push(wave * env * 0.3);
            }
        }
        let n = (SAMPLE_RATE as f32 * 0.25) as usize;
        for i in 0..n {
            let env = 1.0 - (i as f32 / n as f32);
            samples.push(tone(1047.0, i) * env * 0.3);
        }
        samples
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    pub(super) fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new(_sfx_enabled: bool) -> Result<Self, crate::error::MediaError> { Ok(SoundEngine) }
    pub fn start_music(
        &mut self,
        _intro: &std::path::Path,
        _looped: &std::path::Path,
    ) -> Result<(), crate::error::MediaError> {
        Ok(())
    }
    pub fn pause_music(&self) {}
    pub fn play_flip(&self) {}
    pub fn play_match(&self) {}
    pub fn play_miss(&self) {}
    pub fn play_place(&self) {}
    pub fn play_candle(&self) {}
    pub fn play_fanfare(&self) {}
}

#[cfg(all(test, feature = "sound"))]
mod tests {
    use super::inner::*;

    #[test]
    fn wav_header_matches_payload() {
        let samples = gen_flip();
        let wav = make_wav(&samples);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(wav.len(), 44 + samples.len() * 2);
        let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
        assert_eq!(data_size as usize, samples.len() * 2);
        let rate = u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]);
        assert_eq!(rate, SAMPLE_RATE);
    }

    fn wav_file(name: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("wishcard-{}-{}", std::process::id(), name));
        std::fs::write(&path, make_wav(&gen_match())).unwrap();
        path
    }

    #[test]
    fn missing_loop_track_keeps_the_intro() {
        let intro = wav_file("intro.wav");
        let missing = std::env::temp_dir().join("wishcard-no-such-loop.wav");
        let (_, looped) = open_music(&intro, &missing).unwrap();
        assert!(looped.is_none());
        let _ = std::fs::remove_file(intro);
    }

    #[test]
    fn both_tracks_open() {
        let intro = wav_file("intro2.wav");
        let looped = wav_file("loop2.wav");
        let (_, l) = open_music(&intro, &looped).unwrap();
        assert!(l.is_some());
        let _ = std::fs::remove_file(intro);
        let _ = std::fs::remove_file(looped);
    }

    #[test]
    fn missing_intro_is_an_error() {
        let looped = wav_file("loop3.wav");
        let missing = std::env::temp_dir().join("wishcard-no-such-intro.wav");
        assert!(matches!(open_music(&missing, &looped), Err(crate::error::MediaError::Open { .. })));
        let _ = std::fs::remove_file(looped);
    }

    #[test]
    fn effects_stay_in_range() {
        for gen in [gen_flip, gen_match, gen_miss, gen_place, gen_candle, gen_fanfare] {
            let s = gen();
            assert!(!s.is_empty());
            assert!(s.iter().all(|v| v.abs() <= 1.0));
        }
    }
}
