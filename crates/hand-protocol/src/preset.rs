//! Named joint → pulse bundles for calibrated hand shapes.

use bionic_hand_pca9685::PulseValue;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

use crate::error::PresetError;
use crate::joint::Joint;
use crate::servo_map::ServoMap;

/// Calibrated pulse range of the hand's servos.
pub const SERVO_MIN: u16 = 250;
pub const SERVO_MID: u16 = 325;
pub const SERVO_MAX: u16 = 400;

const EXTENDED: &[(Joint, u16)] = &[
    (Joint::INDEX_DIST, 280),
    (Joint::INDEX_MED, 300),
    (Joint::INDEX_PROX, 300),
    (Joint::INDEX_LAT, 305),
    (Joint::MIDDLE_PROX, 290),
    (Joint::MIDDLE_MED, 300),
    (Joint::MIDDLE_LAT, 310),
    (Joint::MIDDLE_DIST, 290),
    (Joint::RING_PROX, 290),
    (Joint::RING_MED, 300),
    (Joint::RING_DIST, 280),
    (Joint::RING_LAT, 305),
    (Joint::LITTLE_PROX, 290),
    (Joint::LITTLE_MED, 290),
    (Joint::LITTLE_DIST, 280),
    (Joint::LITTLE_LAT, 310),
    (Joint::THUMB_PROX, 270),
    (Joint::THUMB_DIST, 270),
    (Joint::THUMB_LAT, 400),
];

const SPREAD: &[(Joint, u16)] = &[
    (Joint::INDEX_DIST, 280),
    (Joint::INDEX_MED, 300),
    (Joint::INDEX_PROX, 300),
    (Joint::INDEX_LAT, 325),
    (Joint::MIDDLE_PROX, 290),
    (Joint::MIDDLE_MED, 300),
    (Joint::MIDDLE_LAT, 320),
    (Joint::MIDDLE_DIST, 290),
    (Joint::RING_PROX, 290),
    (Joint::RING_MED, 300),
    (Joint::RING_DIST, 280),
    (Joint::RING_LAT, 280),
    (Joint::LITTLE_PROX, 290),
    (Joint::LITTLE_MED, 290),
    (Joint::LITTLE_DIST, 280),
    (Joint::LITTLE_LAT, 250),
];

const FIST: &[(Joint, u16)] = &[
    (Joint::INDEX_DIST, 380),
    (Joint::INDEX_MED, 180),
    (Joint::INDEX_PROX, 370),
    (Joint::INDEX_LAT, 305),
    (Joint::MIDDLE_PROX, 200),
    (Joint::MIDDLE_MED, 380),
    (Joint::MIDDLE_LAT, 310),
    (Joint::MIDDLE_DIST, 220),
    (Joint::RING_PROX, 200),
    (Joint::RING_MED, 190),
    (Joint::RING_DIST, 380),
    (Joint::RING_LAT, 305),
    (Joint::LITTLE_PROX, 380),
    (Joint::LITTLE_MED, 200),
    (Joint::LITTLE_DIST, 380),
    (Joint::LITTLE_LAT, 310),
    (Joint::THUMB_LAT, 260),
];

/// Names accepted by [`PositionPreset::builtin`].
pub const BUILTIN_NAMES: [&str; 3] = ["extended", "spread", "fist"];

/// A named hand shape.
///
/// Entries keep insertion order; setting a joint twice keeps the last value
/// in the position of the first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionPreset {
    name: String,
    entries: Vec<(Joint, PulseValue)>,
}

impl PositionPreset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    fn from_table(name: &str, table: &[(Joint, u16)]) -> Self {
        table
            .iter()
            .filter_map(|&(joint, ticks)| PulseValue::new(ticks).map(|p| (joint, p)))
            .fold(Self::new(name), |preset, (joint, pulse)| preset.with(joint, pulse))
    }

    /// All fingers straight, spread joints centred, thumb out.
    pub fn extended() -> Self {
        Self::from_table("extended", EXTENDED)
    }

    /// Extended with the fingers fanned apart. The thumb is left as is.
    pub fn spread() -> Self {
        Self::from_table("spread", SPREAD)
    }

    /// All fingers curled, thumb tucked across the palm.
    pub fn fist() -> Self {
        Self::from_table("fist", FIST)
    }

    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "extended" => Some(Self::extended()),
            "spread" => Some(Self::spread()),
            "fist" => Some(Self::fist()),
            _ => None,
        }
    }

    pub fn builtins() -> Vec<Self> {
        vec![Self::extended(), Self::spread(), Self::fist()]
    }

    /// Every joint of `map` at the same pulse.
    pub fn uniform(name: impl Into<String>, pulse: PulseValue, map: &ServoMap) -> Self {
        map.joints()
            .fold(Self::new(name), |preset, joint| preset.with(joint, pulse))
    }

    /// Parses `"02_dist=300, 01_lat=260"` style assignment lists.
    ///
    /// # Errors
    ///
    /// Returns an error for a token without `=`, an unparsable joint name,
    /// or a pulse that is not a 12-bit decimal integer.
    pub fn parse_assignments(name: impl Into<String>, input: &str) -> Result<Self, PresetError> {
        let mut preset = Self::new(name);
        for token in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let (joint, value) = token
                .split_once('=')
                .ok_or_else(|| PresetError::InvalidAssignment(token.to_string()))?;
            let joint: Joint = joint.trim().parse()?;
            let value = value.trim();
            let pulse = value
                .parse::<u16>()
                .ok()
                .and_then(PulseValue::new)
                .ok_or_else(|| PresetError::PulseOutOfRange {
                    joint,
                    value: value.to_string(),
                })?;
            preset = preset.with(joint, pulse);
        }
        Ok(preset)
    }

    #[must_use]
    pub fn with(mut self, joint: Joint, pulse: PulseValue) -> Self {
        match self.entries.iter_mut().find(|(j, _)| *j == joint) {
            Some(entry) => entry.1 = pulse,
            None => self.entries.push((joint, pulse)),
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[(Joint, PulseValue)] {
        &self.entries
    }

    pub fn pulse(&self, joint: Joint) -> Option<PulseValue> {
        self.entries
            .iter()
            .find_map(|&(j, p)| (j == joint).then_some(p))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct JointPulses<'a>(&'a [(Joint, PulseValue)]);

impl Serialize for JointPulses<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (joint, pulse) in self.0 {
            map.serialize_entry(joint, &pulse.ticks())?;
        }
        map.end()
    }
}

impl Serialize for PositionPreset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("PositionPreset", 2)?;
        s.serialize_field("name", &self.name)?;
        s.serialize_field("joints", &JointPulses(&self.entries))?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joint::Digit;

    fn ticks(preset: &PositionPreset, joint: Joint) -> Option<u16> {
        preset.pulse(joint).map(PulseValue::ticks)
    }

    #[test]
    fn test_builtin_lookup() {
        for name in BUILTIN_NAMES {
            assert_eq!(
                PositionPreset::builtin(name).map(|p| p.name().to_string()),
                Some(name.to_string())
            );
        }
        assert!(PositionPreset::builtin("wave").is_none());
    }

    #[test]
    fn test_extended_covers_whole_hand() {
        let map = ServoMap::standard();
        let preset = PositionPreset::extended();
        assert_eq!(preset.len(), map.len());
        assert!(map.joints().all(|j| preset.pulse(j).is_some()));
        assert_eq!(ticks(&preset, Joint::THUMB_LAT), Some(400));
    }

    #[test]
    fn test_spread_leaves_thumb_alone() {
        let preset = PositionPreset::spread();
        assert!(Joint::flexion_chain(Digit::Thumb)
            .iter()
            .all(|&j| preset.pulse(j).is_none()));
        assert_eq!(preset.pulse(Joint::THUMB_LAT), None);
        assert_eq!(ticks(&preset, Joint::LITTLE_LAT), Some(250));
    }

    #[test]
    fn test_fist_only_moves_thumb_lateral() {
        let preset = PositionPreset::fist();
        assert_eq!(ticks(&preset, Joint::THUMB_LAT), Some(260));
        assert_eq!(preset.pulse(Joint::THUMB_PROX), None);
        assert_eq!(preset.len(), 17);
    }

    #[test]
    fn test_builtin_values_within_servo_range() {
        for preset in PositionPreset::builtins() {
            for (joint, pulse) in preset.entries() {
                assert!(
                    (180..=SERVO_MAX).contains(&pulse.ticks()),
                    "{} {joint} = {pulse}",
                    preset.name()
                );
            }
        }
    }

    #[test]
    fn test_uniform() {
        let map = ServoMap::standard();
        let pulse = PulseValue::new(SERVO_MID).unwrap_or_default();
        let preset = PositionPreset::uniform("centre", pulse, &map);
        assert_eq!(preset.len(), 19);
        assert!(preset.entries().iter().all(|&(_, p)| p.ticks() == SERVO_MID));
    }

    #[test]
    fn test_with_replaces_existing() {
        let preset = PositionPreset::extended()
            .with(Joint::INDEX_DIST, PulseValue::masked(333));
        assert_eq!(preset.len(), 19);
        assert_eq!(
            preset.entries().first(),
            Some(&(Joint::INDEX_DIST, PulseValue::masked(333)))
        );
    }

    #[test]
    fn test_parse_assignments() -> Result<(), PresetError> {
        let preset = PositionPreset::parse_assignments("adhoc", " 02_dist=300, 01_lat = 260,,")?;
        assert_eq!(preset.name(), "adhoc");
        assert_eq!(ticks(&preset, Joint::INDEX_DIST), Some(300));
        assert_eq!(ticks(&preset, Joint::THUMB_LAT), Some(260));
        assert_eq!(preset.len(), 2);
        Ok(())
    }

    #[test]
    fn test_parse_assignments_errors() {
        assert!(matches!(
            PositionPreset::parse_assignments("x", "02_dist"),
            Err(PresetError::InvalidAssignment(_))
        ));
        assert!(matches!(
            PositionPreset::parse_assignments("x", "09_dist=300"),
            Err(PresetError::Joint(_))
        ));
        assert!(matches!(
            PositionPreset::parse_assignments("x", "02_dist=4096"),
            Err(PresetError::PulseOutOfRange { joint: Joint::INDEX_DIST, .. })
        ));
        assert!(matches!(
            PositionPreset::parse_assignments("x", "02_dist=-1"),
            Err(PresetError::PulseOutOfRange { .. })
        ));
    }

    #[test]
    fn test_serialize_as_name_and_joint_map() -> Result<(), serde_json::Error> {
        let preset = PositionPreset::new("pinch")
            .with(Joint::THUMB_LAT, PulseValue::masked(260))
            .with(Joint::INDEX_DIST, PulseValue::masked(380));
        insta::assert_snapshot!(
            serde_json::to_string(&preset)?,
            @r#"{"name":"pinch","joints":{"01_lat":260,"02_dist":380}}"#
        );
        Ok(())
    }
}
