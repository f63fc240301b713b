use std::str::FromStr;

use anyhow::Result;
use serde_repr::{Deserialize_repr, Serialize_repr};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum RouteType {
    Tram = 0,
    Subway = 1,
    Rail = 2,
    Bus = 3,
    Ferry = 4,
    CableTram = 5,
    AerialLift = 6,
    Furnicular = 7,
    Trolleybus = 11,
    Monorail = 12,
}

impl RouteType {
    pub fn all() -> Vec<Self> {
        use RouteType::*;
        vec![
            Tram, Subway, Rail, Bus, Ferry, CableTram, AerialLift, Furnicular, Trolleybus, Monorail,
        ]
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::all().into_iter().find(|rt| rt.code() == code)
    }

    /// True if a raw `route_type` field holds this type's code. Anything that isn't an integer
    /// never matches.
    pub fn matches_field(self, raw: &str) -> bool {
        raw.trim().parse::<u8>().ok() == Some(self.code())
    }
}

impl FromStr for RouteType {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let code: u8 = raw
            .trim()
            .parse()
            .map_err(|_| anyhow!("route type {raw:?} isn't a number"))?;
        match Self::from_code(code) {
            Some(rt) => Ok(rt),
            None => bail!("Unknown route type {code}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_field() {
        assert!(RouteType::Subway.matches_field("1"));
        assert!(RouteType::Subway.matches_field(" 1 "));
        assert!(!RouteType::Subway.matches_field("3"));
        assert!(!RouteType::Subway.matches_field("1.5"));
        assert!(!RouteType::Subway.matches_field(""));
    }

    #[test]
    fn test_from_str() {
        assert_eq!("1".parse::<RouteType>().unwrap(), RouteType::Subway);
        assert_eq!("11".parse::<RouteType>().unwrap(), RouteType::Trolleybus);
        assert!("8".parse::<RouteType>().is_err());
        assert!("metro".parse::<RouteType>().is_err());
    }
}
