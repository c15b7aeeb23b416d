//! Domain primitive types used across the gatesuite workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SuiteError;

/// A deployable variant derived from the canonical compose document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Topology {
    /// Every service in one file behind the reverse proxy.
    #[serde(rename = "traefik")]
    Full,
    /// The OTP service and its providers.
    #[serde(rename = "traefik-herald")]
    Herald,
    /// The user directory and its Redis.
    #[serde(rename = "traefik-warden")]
    Warden,
    /// The forward-auth gateway and the protected demo service.
    #[serde(rename = "traefik-stargate")]
    Stargate,
}

impl Topology {
    /// Every topology, full first.
    pub const ALL: [Self; 4] = [Self::Full, Self::Herald, Self::Warden, Self::Stargate];

    /// The three disjoint slices.
    pub const SLICES: [Self; 3] = [Self::Herald, Self::Warden, Self::Stargate];

    /// Returns the stable name used for directories and API keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "traefik",
            Self::Herald => "traefik-herald",
            Self::Warden => "traefik-warden",
            Self::Stargate => "traefik-stargate",
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topology {
    type Err = SuiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == name)
            .ok_or_else(|| SuiteError::UnknownTopology { name: name.into() })
    }
}

/// A static example compose copied verbatim from its template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExampleMode {
    /// Prebuilt images.
    Image,
    /// Build from source.
    Build,
}

impl ExampleMode {
    /// Both example modes.
    pub const ALL: [Self; 2] = [Self::Image, Self::Build];

    /// Returns the directory name of this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Build => "build",
        }
    }
}

impl fmt::Display for ExampleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a `gen` invocation should produce.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenMode {
    /// Example modes to copy.
    pub examples: Vec<ExampleMode>,
    /// Engine topologies to generate.
    pub topologies: Vec<Topology>,
}

impl GenMode {
    /// Every example mode and every topology.
    #[must_use]
    pub fn all() -> Self {
        Self {
            examples: ExampleMode::ALL.to_vec(),
            topologies: Topology::ALL.to_vec(),
        }
    }

    /// Names of every artifact directory this mode writes, in order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.examples
            .iter()
            .map(|m| m.as_str())
            .chain(self.topologies.iter().map(|t| t.as_str()))
            .collect()
    }
}

impl FromStr for GenMode {
    type Err = SuiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let arg = s.trim();
        match arg {
            "" | "all" => Ok(Self::all()),
            "image" => Ok(Self {
                examples: vec![ExampleMode::Image],
                topologies: Vec::new(),
            }),
            "build" => Ok(Self {
                examples: vec![ExampleMode::Build],
                topologies: Vec::new(),
            }),
            // `traefik` alone means the full family.
            "traefik" => Ok(Self {
                examples: Vec::new(),
                topologies: Topology::ALL.to_vec(),
            }),
            other => other
                .parse::<Topology>()
                .map(|t| Self {
                    examples: Vec::new(),
                    topologies: vec![t],
                })
                .map_err(|_| SuiteError::UnknownMode { name: other.into() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topology_round_trips_through_name() {
        for t in Topology::ALL {
            assert_eq!(t.as_str().parse::<Topology>().expect("parse"), t);
        }
    }

    #[test]
    fn unknown_topology_is_rejected() {
        let err = "traefik-nope".parse::<Topology>().unwrap_err();
        assert!(matches!(err, SuiteError::UnknownTopology { .. }));
    }

    #[test]
    fn gen_mode_traefik_expands_to_every_topology() {
        let mode: GenMode = "traefik".parse().expect("parse");
        assert!(mode.examples.is_empty());
        assert_eq!(mode.topologies, Topology::ALL.to_vec());
    }

    #[test]
    fn gen_mode_all_includes_examples() {
        let mode: GenMode = "".parse().expect("parse");
        assert_eq!(
            mode.names(),
            vec![
                "image",
                "build",
                "traefik",
                "traefik-herald",
                "traefik-warden",
                "traefik-stargate"
            ]
        );
    }

    #[test]
    fn gen_mode_single_slice() {
        let mode: GenMode = "traefik-warden".parse().expect("parse");
        assert_eq!(mode.topologies, vec![Topology::Warden]);
    }

    #[test]
    fn gen_mode_rejects_unknown() {
        let err = "compose".parse::<GenMode>().unwrap_err();
        assert!(matches!(err, SuiteError::UnknownMode { .. }));
    }
}
