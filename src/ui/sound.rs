/// Sound engine: procedural 8-bit style sound effects via rodio.
///
/// All sounds are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile without the "sound" feature to disable audio entirely
/// (the stub SoundEngine does nothing).

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    const SAMPLE_RATE: u32 = 22050;

    /// Pre-generated WAV buffers for each sound effect.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_slide: Arc<Vec<u8>>,
        sfx_win: Arc<Vec<u8>>,
        sfx_lose: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = OutputStream::try_default().ok()?;

            let sfx_slide = Arc::new(make_wav(&gen_slide()));
            let sfx_win = Arc::new(make_wav(&gen_win()));
            let sfx_lose = Arc::new(make_wav(&gen_lose()));

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_slide,
                sfx_win,
                sfx_lose,
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }

        pub fn play_slide(&self) {
            self.play(&self.sfx_slide);
        }

        pub fn play_win(&self) {
            self.play(&self.sfx_win);
        }

        pub fn play_lose(&self) {
            self.play(&self.sfx_lose);
        }
    }

    // ── Waveform generators — Vec<f32> mono samples ──

    /// Slide: short whoosh, pitch falling 520Hz → 260Hz.
    fn gen_slide() -> Vec<f32> {
        let duration = 0.09;
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = 520.0 - t * 260.0;
                let ti = i as f32 / SAMPLE_RATE as f32;
                let env = (1.0 - t).powf(0.7);
                (ti * freq * 2.0 * std::f32::consts::PI).sin() * env * 0.2
            })
            .collect()
    }

    /// Win: ascending fanfare C5 → E5 → G5 → C6, last note sustained.
    fn gen_win() -> Vec<f32> {
        let notes = [523.0_f32, 659.0, 784.0, 1047.0];
        let mut samples = Vec::new();
        for (idx, &freq) in notes.iter().enumerate() {
            let dur = if idx + 1 == notes.len() { 0.28 } else { 0.09 };
            let n = (SAMPLE_RATE as f32 * dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.6;
                // Sine plus a touch of 2nd harmonic for a retro edge
                let wave = (t * freq * 2.0 * std::f32::consts::PI).sin() * 0.7
                    + (t * freq * 2.0 * 2.0 * std::f32::consts::PI).sin() * 0.3;
                samples.push(wave * env * 0.3);
            }
        }
        samples
    }

    /// Lose: three sagging tones A4 → F4 → C4.
    fn gen_lose() -> Vec<f32> {
        let notes = [440.0_f32, 349.0, 262.0];
        let note_dur = 0.14;
        let mut samples = Vec::new();
        for &freq in &notes {
            let n = (SAMPLE_RATE as f32 * note_dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.4;
                samples.push((t * freq * 2.0 * std::f32::consts::PI).sin() * env * 0.3);
            }
        }
        // Final fade so the last note doesn't click
        let fade_len = samples.len() / 5;
        let total = samples.len();
        for i in (total - fade_len)..total {
            let ratio = (total - i) as f32 / fade_len as f32;
            samples[i] *= ratio;
        }
        samples
    }

    // ── WAV encoder — wraps f32 samples into a valid WAV buffer ──

    fn make_wav(samples: &[f32]) -> Vec<u8> {
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
            let clamped = s.max(-1.0).min(1.0);
            let val = (clamped * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }
}

// ── Public API — compiles to no-ops when sound feature is off ──

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> {
        Some(SoundEngine)
    }
    pub fn play_slide(&self) {}
    pub fn play_win(&self) {}
    pub fn play_lose(&self) {}
}
