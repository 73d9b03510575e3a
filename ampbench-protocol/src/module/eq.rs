//! Equalizer presets
//!
//! The module exposes 11 fixed presets. USER (index 10) is addressable for
//! display but excluded from auto-cycling: some module firmwares report it
//! spontaneously and cycling into it would trap the user in an
//! unpredictable curve.

/// Number of presets, USER included
pub const PRESET_COUNT: u8 = 11;

/// Number of presets visited by cycling (USER excluded)
pub const CYCLE_LEN: u8 = 10;

/// One of the module's fixed equalizer presets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EqPreset {
    Off,
    Soft,
    Bass,
    Treble,
    Classical,
    Rock,
    Jazz,
    Pop,
    Dance,
    Rnb,
    User,
}

impl EqPreset {
    /// Wire index of this preset (0-10)
    pub fn index(self) -> u8 {
        match self {
            EqPreset::Off => 0,
            EqPreset::Soft => 1,
            EqPreset::Bass => 2,
            EqPreset::Treble => 3,
            EqPreset::Classical => 4,
            EqPreset::Rock => 5,
            EqPreset::Jazz => 6,
            EqPreset::Pop => 7,
            EqPreset::Dance => 8,
            EqPreset::Rnb => 9,
            EqPreset::User => 10,
        }
    }

    /// Preset for a wire index, `None` for out-of-range values
    pub fn from_index(index: u8) -> Option<Self> {
        Some(match index {
            0 => EqPreset::Off,
            1 => EqPreset::Soft,
            2 => EqPreset::Bass,
            3 => EqPreset::Treble,
            4 => EqPreset::Classical,
            5 => EqPreset::Rock,
            6 => EqPreset::Jazz,
            7 => EqPreset::Pop,
            8 => EqPreset::Dance,
            9 => EqPreset::Rnb,
            10 => EqPreset::User,
            _ => return None,
        })
    }

    /// Canonical display label
    pub fn label(self) -> &'static str {
        match self {
            EqPreset::Off => "OFF",
            EqPreset::Soft => "SOFT",
            EqPreset::Bass => "BASS",
            EqPreset::Treble => "TREBLE",
            EqPreset::Classical => "CLASSICAL",
            EqPreset::Rock => "ROCK",
            EqPreset::Jazz => "JAZZ",
            EqPreset::Pop => "POP",
            EqPreset::Dance => "DANCE",
            EqPreset::Rnb => "R&B",
            EqPreset::User => "USER",
        }
    }

    /// Label for a reported mode byte; unknown modes display as OFF
    pub fn label_for_mode(mode: u8) -> &'static str {
        Self::from_index(mode).map_or("OFF", Self::label)
    }

    /// The preset cycling advances to from the given current mode.
    ///
    /// Wraps within 0-9; USER and unrecognized modes fall back to OFF so a
    /// lost command or an odd device report cannot derail the cycle.
    pub fn next_in_cycle(current_mode: u8) -> Self {
        if current_mode < CYCLE_LEN {
            // Cannot fail: (current + 1) % 10 is always a valid index
            Self::from_index((current_mode + 1) % CYCLE_LEN).unwrap_or(EqPreset::Off)
        } else {
            EqPreset::Off
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_roundtrip() {
        for i in 0..PRESET_COUNT {
            assert_eq!(EqPreset::from_index(i).unwrap().index(), i);
        }
        assert!(EqPreset::from_index(11).is_none());
    }

    #[test]
    fn test_cycle_visits_all_but_user() {
        let mut mode = 3u8;
        let mut visited = [false; 10];
        for _ in 0..CYCLE_LEN {
            let next = EqPreset::next_in_cycle(mode);
            assert_ne!(next, EqPreset::User);
            mode = next.index();
            assert!(!visited[mode as usize], "mode {} visited twice", mode);
            visited[mode as usize] = true;
        }
        assert!(visited.iter().all(|&v| v));
    }

    #[test]
    fn test_cycle_from_user_falls_back_to_off() {
        assert_eq!(EqPreset::next_in_cycle(10), EqPreset::Off);
        assert_eq!(EqPreset::next_in_cycle(0xFF), EqPreset::Off);
    }

    #[test]
    fn test_labels() {
        assert_eq!(EqPreset::Off.label(), "OFF");
        assert_eq!(EqPreset::Rnb.label(), "R&B");
        assert_eq!(EqPreset::label_for_mode(10), "USER");
        assert_eq!(EqPreset::label_for_mode(42), "OFF");
    }
}
