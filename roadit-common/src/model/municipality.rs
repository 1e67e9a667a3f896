use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Municipal bodies the service routes issues to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Municipality {
    #[serde(rename = "NDMC")]
    Ndmc,
    #[serde(rename = "BMC")]
    Bmc,
    #[serde(rename = "BBMP")]
    Bbmp,
    #[serde(rename = "KMC")]
    Kmc,
    #[serde(rename = "GCC")]
    Gcc,
    #[serde(rename = "GHMC")]
    Ghmc,
}

impl Municipality {
    pub const ALL: [Municipality; 6] = [
        Municipality::Ndmc,
        Municipality::Bmc,
        Municipality::Bbmp,
        Municipality::Kmc,
        Municipality::Gcc,
        Municipality::Ghmc,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Municipality::Ndmc => "NDMC",
            Municipality::Bmc => "BMC",
            Municipality::Bbmp => "BBMP",
            Municipality::Kmc => "KMC",
            Municipality::Gcc => "GCC",
            Municipality::Ghmc => "GHMC",
        }
    }

    pub fn full_name(&self) -> &'static str {
        match self {
            Municipality::Ndmc => "New Delhi Municipal Council",
            Municipality::Bmc => "Brihanmumbai Municipal Corporation",
            Municipality::Bbmp => "Bruhat Bengaluru Mahanagara Palike",
            Municipality::Kmc => "Kolkata Municipal Corporation",
            Municipality::Gcc => "Greater Chennai Corporation",
            Municipality::Ghmc => "Greater Hyderabad Municipal Corporation",
        }
    }

    /// City names (current and historical) served by this body
    fn cities(&self) -> &'static [&'static str] {
        match self {
            Municipality::Ndmc => &["new delhi", "delhi"],
            Municipality::Bmc => &["mumbai", "bombay"],
            Municipality::Bbmp => &["bengaluru", "bangalore", "bengaluru urban"],
            Municipality::Kmc => &["kolkata", "calcutta"],
            Municipality::Gcc => &["chennai", "madras"],
            Municipality::Ghmc => &["hyderabad"],
        }
    }

    /// Match a free-form place name (code, full name or city) to a body
    ///
    /// Resolver output is a locality or a formatted address, so a
    /// comma-separated address is matched component by component.
    pub fn from_place_name(name: &str) -> Option<Municipality> {
        let normalized = name.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }

        if let Some(found) = Self::match_exact(&normalized) {
            return Some(found);
        }

        normalized
            .split(',')
            .map(str::trim)
            .find_map(Self::match_exact)
    }

    fn match_exact(candidate: &str) -> Option<Municipality> {
        Self::ALL.iter().copied().find(|m| {
            m.code().eq_ignore_ascii_case(candidate)
                || m.full_name().to_lowercase() == candidate
                || m.cities().contains(&candidate)
        })
    }
}

impl fmt::Display for Municipality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Municipality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.code() == s)
            .ok_or_else(|| format!("Unsupported municipality \"{}\"", s))
    }
}
