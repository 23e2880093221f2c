pub const LOW_ALTITUDE_CEILING_FT: i32 = 10_000;
pub const MID_ALTITUDE_CEILING_FT: i32 = 30_000;

pub const LOW_TONE_HZ: f64 = 800.0;
pub const MID_TONE_HZ: f64 = 1200.0;
pub const HIGH_TONE_HZ: f64 = 1800.0;

pub const TONE_DURATION_MS: u64 = 50;

pub const MAX_VOLUME: u8 = 20;
pub const DEFAULT_VOLUME: u8 = 10;
const MAX_GAIN: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency_hz: f64,
    pub duration_ms: u64,
    pub gain: f64,
}

/// Unknown altitude falls in the middle band.
#[must_use]
pub fn tone_for_altitude(altitude_ft: i32) -> f64 {
    if altitude_ft < 0 {
        MID_TONE_HZ
    } else if altitude_ft < LOW_ALTITUDE_CEILING_FT {
        LOW_TONE_HZ
    } else if altitude_ft < MID_ALTITUDE_CEILING_FT {
        MID_TONE_HZ
    } else {
        HIGH_TONE_HZ
    }
}

#[must_use]
pub fn gain_for_volume(volume: u8) -> f64 {
    MAX_GAIN * f64::from(volume.min(MAX_VOLUME)) / f64::from(MAX_VOLUME)
}

/// The cue for a newly painted track, or `None` when muted.
#[must_use]
pub fn paint_cue(altitude_ft: i32, volume: u8) -> Option<Tone> {
    (volume > 0).then(|| Tone {
        frequency_hz: tone_for_altitude(altitude_ft),
        duration_ms: TONE_DURATION_MS,
        gain: gain_for_volume(volume),
    })
}

/// Whatever actually makes the sound.
pub trait ToneSink: Send {
    fn play_tone(&mut self, tone: Tone);
}

/// Logs each cue instead of playing it.
#[derive(Debug, Default)]
pub struct LogToneSink;

impl ToneSink for LogToneSink {
    fn play_tone(&mut self, tone: Tone) {
        log::debug!(
            "Tone {} Hz for {} ms at gain {:.3}",
            tone.frequency_hz,
            tone.duration_ms,
            tone.gain
        );
    }
}

/// Keeps every cue; handy for inspecting what a frame would have played.
#[derive(Debug, Default)]
pub struct RecordingToneSink {
    pub played: Vec<Tone>,
}

impl ToneSink for RecordingToneSink {
    fn play_tone(&mut self, tone: Tone) {
        self.played.push(tone);
    }
}

#[cfg(test)]
mod tests {
    use super::{gain_for_volume, paint_cue, tone_for_altitude};

    #[test]
    fn when_altitude_crosses_band_breakpoints_then_tone_changes() {
        assert_eq!(tone_for_altitude(0), 800.0);
        assert_eq!(tone_for_altitude(9_999), 800.0);
        assert_eq!(tone_for_altitude(10_000), 1200.0);
        assert_eq!(tone_for_altitude(29_999), 1200.0);
        assert_eq!(tone_for_altitude(30_000), 1800.0);
    }

    #[test]
    fn when_altitude_unknown_then_middle_tone() {
        assert_eq!(tone_for_altitude(-1), 1200.0);
    }

    #[test]
    fn when_volume_zero_then_no_cue() {
        assert!(paint_cue(5000, 0).is_none());
        let cue = paint_cue(5000, 20).expect("audible");
        assert_eq!(cue.duration_ms, 50);
        assert!((cue.gain - 0.25).abs() < 1e-12);
    }

    #[test]
    fn when_volume_above_maximum_then_gain_capped() {
        assert!((gain_for_volume(10) - 0.125).abs() < 1e-12);
        assert!((gain_for_volume(200) - 0.25).abs() < 1e-12);
    }
}
