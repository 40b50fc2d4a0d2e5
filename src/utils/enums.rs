use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::FinalStateError;

/// The concrete kind of a reconstructed candidate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandidateKind {
    /// A reconstructed electron.
    Electron,
    /// A reconstructed muon.
    Muon,
    /// A hadronically-decaying tau lepton.
    Tau,
    /// A clustered jet.
    Jet,
    /// A reconstructed photon.
    Photon,
    /// Any other candidate (isolation particles, tracks, composite objects).
    Generic,
}

impl CandidateKind {
    /// The kind implied by a PDG particle code, with jets and unknown codes treated as
    /// [`CandidateKind::Generic`].
    pub fn from_pdg_id(pdg_id: i32) -> Self {
        match pdg_id.abs() {
            11 => Self::Electron,
            13 => Self::Muon,
            15 => Self::Tau,
            22 => Self::Photon,
            _ => Self::Generic,
        }
    }

    /// Whether this kind is one of the charged lepton flavours.
    pub fn is_lepton(&self) -> bool {
        matches!(self, Self::Electron | Self::Muon | Self::Tau)
    }
}

impl Display for CandidateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandidateKind::Electron => write!(f, "Electron"),
            CandidateKind::Muon => write!(f, "Muon"),
            CandidateKind::Tau => write!(f, "Tau"),
            CandidateKind::Jet => write!(f, "Jet"),
            CandidateKind::Photon => write!(f, "Photon"),
            CandidateKind::Generic => write!(f, "Generic"),
        }
    }
}

impl FromStr for CandidateKind {
    type Err = FinalStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "electron" | "e" | "ele" => Ok(Self::Electron),
            "muon" | "m" | "mu" => Ok(Self::Muon),
            "tau" | "t" => Ok(Self::Tau),
            "jet" | "j" => Ok(Self::Jet),
            "photon" | "g" | "gamma" => Ok(Self::Photon),
            "generic" | "candidate" => Ok(Self::Generic),
            _ => Err(FinalStateError::ParseError {
                name: s.to_string(),
                object: "CandidateKind".to_string(),
            }),
        }
    }
}
