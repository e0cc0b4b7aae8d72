// Closed vocabularies shared by the rule engine and the wire protocol.
//
// Every value a client can name (the half at bat, a base a runner occupies,
// what happened on the pitch) is a tagged enum here rather than a bare
// string. Parsing is the one place an unrecognized spelling can appear,
// and it fails loudly (`UnknownResult`, or a serde error) instead of falling
// through as a no-op.
//
// Wire spellings: halves are "AWAY"/"HOME", bases are "1B"/"2B"/"3B", and
// results use the upper-case codes listed on `PlayResult`. Result codes and
// base codes are accepted case-insensitively on input and always emitted in
// their canonical upper-case form.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Which team is at bat. AWAY leads off every inning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Half {
    #[serde(rename = "AWAY")]
    Away,
    #[serde(rename = "HOME")]
    Home,
}

impl Half {
    /// The other half of the inning.
    pub fn toggled(self) -> Self {
        match self {
            Half::Away => Half::Home,
            Half::Home => Half::Away,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Half::Away => "AWAY",
            Half::Home => "HOME",
        }
    }
}

impl fmt::Display for Half {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An occupiable base. Home plate is not a base here: a runner advancing past
/// third scores and leaves the basepaths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Base {
    First,
    Second,
    Third,
}

impl Base {
    /// All bases in basepath order.
    pub const ALL: [Base; 3] = [Base::First, Base::Second, Base::Third];

    /// 1 for first, 2 for second, 3 for third.
    pub fn index(self) -> u8 {
        match self {
            Base::First => 1,
            Base::Second => 2,
            Base::Third => 3,
        }
    }

    /// Inverse of `index`. Anything outside 1..=3 is not a base.
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(Base::First),
            2 => Some(Base::Second),
            3 => Some(Base::Third),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Base::First => "1B",
            Base::Second => "2B",
            Base::Third => "3B",
        }
    }
}

impl fmt::Display for Base {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A base code that is not "1B", "2B", or "3B".
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown base `{0}`")]
pub struct UnknownBase(pub String);

impl FromStr for Base {
    type Err = UnknownBase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Base::ALL
            .into_iter()
            .find(|base| base.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownBase(s.to_owned()))
    }
}

impl Serialize for Base {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Base {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// The outcome of a single pitch or play, as reported by a scorer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlayResult {
    Out,
    Strike,
    Ball,
    Foul,
    Single,
    Double,
    Triple,
    HomeRun,
    SacFly,
    SacBunt,
    Error,
    Steal,
    CaughtStealing,
    WildPitch,
    Balk,
}

impl PlayResult {
    pub const ALL: [PlayResult; 15] = [
        PlayResult::Out,
        PlayResult::Strike,
        PlayResult::Ball,
        PlayResult::Foul,
        PlayResult::Single,
        PlayResult::Double,
        PlayResult::Triple,
        PlayResult::HomeRun,
        PlayResult::SacFly,
        PlayResult::SacBunt,
        PlayResult::Error,
        PlayResult::Steal,
        PlayResult::CaughtStealing,
        PlayResult::WildPitch,
        PlayResult::Balk,
    ];

    /// Canonical wire code.
    pub fn code(self) -> &'static str {
        match self {
            PlayResult::Out => "OUT",
            PlayResult::Strike => "STRIKE",
            PlayResult::Ball => "BALL",
            PlayResult::Foul => "FOUL",
            PlayResult::Single => "1B",
            PlayResult::Double => "2B",
            PlayResult::Triple => "3B",
            PlayResult::HomeRun => "HR",
            PlayResult::SacFly => "SAC_FLY",
            PlayResult::SacBunt => "SAC_BUNT",
            PlayResult::Error => "ERROR",
            PlayResult::Steal => "STEAL",
            PlayResult::CaughtStealing => "CAUGHT_STEALING",
            PlayResult::WildPitch => "WILD_PITCH",
            PlayResult::Balk => "BALK",
        }
    }

    /// For base hits, the base the batter ends up on.
    pub fn hit_base(self) -> Option<Base> {
        match self {
            PlayResult::Single => Some(Base::First),
            PlayResult::Double => Some(Base::Second),
            PlayResult::Triple => Some(Base::Third),
            _ => None,
        }
    }
}

impl fmt::Display for PlayResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A result code outside the accepted vocabulary.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown result code `{0}`")]
pub struct UnknownResult(pub String);

impl FromStr for PlayResult {
    type Err = UnknownResult;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlayResult::ALL
            .into_iter()
            .find(|result| result.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownResult(s.to_owned()))
    }
}

impl Serialize for PlayResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for PlayResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_codes_parse_case_insensitively() {
        assert_eq!("hr".parse::<PlayResult>(), Ok(PlayResult::HomeRun));
        assert_eq!("Sac_Fly".parse::<PlayResult>(), Ok(PlayResult::SacFly));
        assert_eq!("1b".parse::<PlayResult>(), Ok(PlayResult::Single));
        assert_eq!(
            "wild_pitch".parse::<PlayResult>(),
            Ok(PlayResult::WildPitch)
        );
    }

    #[test]
    fn every_result_code_parses_back_to_itself() {
        for result in PlayResult::ALL {
            assert_eq!(result.code().parse::<PlayResult>(), Ok(result));
        }
    }

    #[test]
    fn unknown_result_code_is_rejected() {
        let err = "BUNT_SINGLE".parse::<PlayResult>().unwrap_err();
        assert_eq!(err, UnknownResult("BUNT_SINGLE".into()));
        assert_eq!(err.to_string(), "unknown result code `BUNT_SINGLE`");
    }

    #[test]
    fn result_deserializes_from_lowercase_json() {
        let result: PlayResult = serde_json::from_str(r#""caught_stealing""#).unwrap();
        assert_eq!(result, PlayResult::CaughtStealing);
        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#""CAUGHT_STEALING""#
        );
    }

    #[test]
    fn result_deserialize_rejects_unknown_code() {
        assert!(serde_json::from_str::<PlayResult>(r#""TRIPLE_PLAY""#).is_err());
    }

    #[test]
    fn base_index_roundtrip_and_bounds() {
        for base in Base::ALL {
            assert_eq!(Base::from_index(base.index()), Some(base));
        }
        assert_eq!(Base::from_index(0), None);
        assert_eq!(Base::from_index(4), None);
    }

    #[test]
    fn base_wire_spelling() {
        assert_eq!(serde_json::to_string(&Base::Second).unwrap(), r#""2B""#);
        let base: Base = serde_json::from_str(r#""3b""#).unwrap();
        assert_eq!(base, Base::Third);
        assert!(serde_json::from_str::<Base>(r#""HOME""#).is_err());
    }

    #[test]
    fn half_toggles_and_serializes() {
        assert_eq!(Half::Away.toggled(), Half::Home);
        assert_eq!(Half::Home.toggled(), Half::Away);
        assert_eq!(serde_json::to_string(&Half::Home).unwrap(), r#""HOME""#);
    }

    #[test]
    fn hit_base_only_for_base_hits() {
        assert_eq!(PlayResult::Double.hit_base(), Some(Base::Second));
        assert_eq!(PlayResult::HomeRun.hit_base(), None);
        assert_eq!(PlayResult::Error.hit_base(), None);
    }
}
