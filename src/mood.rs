//! ==============================================================================
//! mood.rs - Plant Mood Inference
//! ==============================================================================
//!
//! purpose:
//!     maps raw sensor values to a discrete plant mood, and maps moods to
//!     their display glyphs / labels / wire names.
//!
//! the classifier is a pure, total function: no state, no side effects,
//!     recomputed from scratch every tick. rule order is a deliberate
//!     tie-break (too-wet soil wins over heat, for example).
//!
//! relationships:
//!     - used by: sched.rs (classification), display.rs (glyph/label),
//!       live.rs / durable.rs (wire name)
//!
//! ==============================================================================

// thresholds in raw ADC units (0-4095), calibrated for resistive probes
pub const SOIL_DRY_BELOW: u16 = 1500;
pub const SOIL_HAPPY_MAX: u16 = 3100;
pub const SOIL_WET_ABOVE: u16 = 3500;
pub const LIGHT_HOT_ABOVE: u16 = 2500;
pub const TEMP_HOT_AT_C: f32 = 27.0;

/// Closed set of plant moods. Derived deterministically from one tick's
/// readings; carries no state of its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mood {
    Thirsty,
    Drowning,
    Hot,
    Happy,
    Neutral,
}

/// Infer the plant's mood from raw readings. First matching rule wins:
///
/// 1. soil below the dry threshold        -> Thirsty
/// 2. soil above the wet threshold        -> Drowning
/// 3. too bright or too warm              -> Hot
/// 4. soil in the healthy band            -> Happy
/// 5. otherwise (3101-3500 "acceptable but not ideal" band) -> Neutral
///
/// A faulted temperature read arrives as the -100 sentinel, which can never
/// trip the heat rule.
pub fn classify(soil_raw: u16, light_raw: u16, temp_c: f32) -> Mood {
    if soil_raw < SOIL_DRY_BELOW {
        return Mood::Thirsty;
    }
    if soil_raw > SOIL_WET_ABOVE {
        return Mood::Drowning;
    }
    if light_raw > LIGHT_HOT_ABOVE || temp_c >= TEMP_HOT_AT_C {
        return Mood::Hot;
    }
    if soil_raw <= SOIL_HAPPY_MAX {
        return Mood::Happy;
    }
    Mood::Neutral
}

impl Mood {
    /// ASCII face shown large on the OLED
    pub fn glyph(self) -> &'static str {
        match self {
            Mood::Happy => "  ^_^  ",
            Mood::Thirsty => "  O_O  ",
            Mood::Drowning => " @_@  ",
            Mood::Hot => "  >_<  ",
            Mood::Neutral => "  -_-  ",
        }
    }

    /// human-readable phrase shown under the face
    pub fn label(self) -> &'static str {
        match self {
            Mood::Happy => "I'm Happy!",
            Mood::Thirsty => "I'm Thirsty",
            Mood::Drowning => "Too Wet!",
            Mood::Hot => "Too Hot!",
            Mood::Neutral => "I'm OK",
        }
    }

    /// lowercase name used in both JSON payloads. Neutral goes out as "ok",
    /// which is what existing viewers and the log store schema expect.
    pub fn wire_name(self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Thirsty => "thirsty",
            Mood::Drowning => "drowning",
            Mood::Hot => "hot",
            Mood::Neutral => "ok",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_soil_is_thirsty_regardless_of_everything_else() {
        assert_eq!(classify(0, 0, 20.0), Mood::Thirsty);
        assert_eq!(classify(1499, 4095, 40.0), Mood::Thirsty);
    }

    #[test]
    fn wet_soil_drowns_even_when_hot() {
        assert_eq!(classify(3501, 100, 20.0), Mood::Drowning);
        // drowning takes priority over any hot trigger
        assert_eq!(classify(4000, 4095, 35.0), Mood::Drowning);
    }

    #[test]
    fn healthy_soil_is_happy() {
        assert_eq!(classify(2000, 100, 20.0), Mood::Happy);
    }

    #[test]
    fn bright_light_overrides_happy_soil() {
        assert_eq!(classify(2000, 3000, 20.0), Mood::Hot);
    }

    #[test]
    fn warm_air_overrides_happy_soil() {
        assert_eq!(classify(2000, 100, 27.0), Mood::Hot);
        assert_eq!(classify(2000, 100, 26.9), Mood::Happy);
    }

    #[test]
    fn gap_band_is_neutral_not_happy_or_drowning() {
        assert_eq!(classify(3200, 100, 20.0), Mood::Neutral);
        assert_eq!(classify(3500, 100, 20.0), Mood::Neutral);
    }

    #[test]
    fn happy_band_is_boundary_inclusive() {
        assert_eq!(classify(1500, 100, 20.0), Mood::Happy);
        assert_eq!(classify(3100, 100, 20.0), Mood::Happy);
        assert_eq!(classify(1499, 100, 20.0), Mood::Thirsty);
        assert_eq!(classify(3101, 100, 20.0), Mood::Neutral);
    }

    #[test]
    fn temp_sentinel_never_reads_as_hot() {
        assert_eq!(classify(2000, 100, crate::sensors::TEMP_SENTINEL), Mood::Happy);
    }

    #[test]
    fn wire_names_match_store_schema() {
        assert_eq!(Mood::Neutral.wire_name(), "ok");
        assert_eq!(Mood::Drowning.wire_name(), "drowning");
    }
}
