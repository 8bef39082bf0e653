/// Sound engine: procedural effects via rodio.
///
/// Every effect is synthesised once into an in-memory WAV buffer at
/// startup and played fire-and-forget through a detached `Sink`.
///
/// Build without the "sound" feature to get the silent stub below.

#[cfg(feature = "sound")]
mod inner {
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    pub(super) const SAMPLE_RATE: u32 = 22050;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_push: Arc<Vec<u8>>,
        sfx_switch: Arc<Vec<u8>>,
        sfx_door: Arc<Vec<u8>>,
        sfx_echo: Arc<Vec<u8>>,
        sfx_fizzle: Arc<Vec<u8>>,
        sfx_solved: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = OutputStream::try_default().ok()?;
            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_push: Arc::new(make_wav(&gen_push())),
                sfx_switch: Arc::new(make_wav(&gen_switch())),
                sfx_door: Arc::new(make_wav(&gen_door())),
                sfx_echo: Arc::new(make_wav(&gen_echo())),
                sfx_fizzle: Arc::new(make_wav(&gen_fizzle())),
                sfx_solved: Arc::new(make_wav(&gen_solved())),
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach();
                }
            }
        }

        pub fn play_push(&self) { self.play(&self.sfx_push); }
        pub fn play_switch(&self) { self.play(&self.sfx_switch); }
        pub fn play_door(&self) { self.play(&self.sfx_door); }
        pub fn play_echo(&self) { self.play(&self.sfx_echo); }
        pub fn play_fizzle(&self) { self.play(&self.sfx_fizzle); }
        pub fn play_solved(&self) { self.play(&self.sfx_solved); }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators (mono f32 samples)
    // ════════════════════════════════════════════════════════════

    fn frames(duration: f32) -> usize {
        (SAMPLE_RATE as f32 * duration) as usize
    }

    /// One note with a linear fade, optionally with an octave overtone.
    fn tone(out: &mut Vec<f32>, freq: f32, duration: f32, volume: f32, overtone: f32) {
        let n = frames(duration);
        for i in 0..n {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - i as f32 / n as f32;
            let wave = (t * freq * TAU).sin() * (1.0 - overtone)
                + (t * freq * 2.0 * TAU).sin() * overtone;
            out.push(wave * env * volume);
        }
    }

    /// Crate push: low thud with a touch of noise.
    fn gen_push() -> Vec<f32> {
        let n = frames(0.09);
        let mut rng: u32 = 2463534242;
        (0..n)
            .map(|i| {
                let p = i as f32 / n as f32;
                let t = i as f32 / SAMPLE_RATE as f32;
                let freq = 140.0 - p * 60.0;
                rng ^= rng << 13;
                rng ^= rng >> 17;
                rng ^= rng << 5;
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                ((t * freq * TAU).sin() * 0.8 + noise * 0.2) * (1.0 - p).powf(1.5) * 0.35
            })
            .collect()
    }

    /// Switch pressed: short high click.
    fn gen_switch() -> Vec<f32> {
        let mut s = Vec::new();
        tone(&mut s, 1319.0, 0.03, 0.25, 0.2);
        tone(&mut s, 1760.0, 0.04, 0.2, 0.2);
        s
    }

    /// Door opened: rising fifth G4 → D5.
    fn gen_door() -> Vec<f32> {
        let mut s = Vec::new();
        tone(&mut s, 392.0, 0.1, 0.3, 0.3);
        tone(&mut s, 587.0, 0.2, 0.3, 0.3);
        s
    }

    /// Echo spawned: upward sweep with a slow tremolo.
    fn gen_echo() -> Vec<f32> {
        let n = frames(0.25);
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let p = i as f32 / n as f32;
                let freq = 330.0 + p * 550.0;
                phase += freq / SAMPLE_RATE as f32;
                let trem = 0.75 + 0.25 * (p * 24.0 * TAU / 4.0).sin();
                (phase * TAU).sin() * trem * (1.0 - p) * 0.25
            })
            .collect()
    }

    /// Echo spawn refused: two flat low beeps.
    fn gen_fizzle() -> Vec<f32> {
        let mut s = Vec::new();
        tone(&mut s, 180.0, 0.06, 0.2, 0.5);
        s.extend(std::iter::repeat(0.0).take(frames(0.03)));
        tone(&mut s, 150.0, 0.08, 0.2, 0.5);
        s
    }

    /// Level solved: C major arpeggio with a held top note.
    fn gen_solved() -> Vec<f32> {
        let mut s = Vec::new();
        for freq in [523.0_f32, 659.0, 784.0] {
            tone(&mut s, freq, 0.09, 0.3, 0.3);
        }
        tone(&mut s, 1047.0, 0.35, 0.3, 0.2);
        s
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: 16-bit mono PCM
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

    #[cfg(test)]
    pub(super) fn all_effects() -> Vec<Vec<f32>> {
        vec![gen_push(), gen_switch(), gen_door(), gen_echo(), gen_fizzle(), gen_solved()]
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: no-ops when the sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_push(&self) {}
    pub fn play_switch(&self) {}
    pub fn play_door(&self) {}
    pub fn play_echo(&self) {}
    pub fn play_fizzle(&self) {}
    pub fn play_solved(&self) {}
}
