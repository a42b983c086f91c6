//! Core type definitions for indexes and library items.
//!
//! All enums serialize in lowercase, matching how they are stored in the
//! database and exposed to hosts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of media index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// Video index (movies, shows, generic videos). The only type the
    /// scanner currently operates on.
    Videos,
    /// Photo index.
    Photos,
    /// Audio index.
    Audio,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Videos => write!(f, "videos"),
            Self::Photos => write!(f, "photos"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

impl std::str::FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "videos" => Ok(Self::Videos),
            "photos" => Ok(Self::Photos),
            "audio" => Ok(Self::Audio),
            _ => Err(format!("Invalid media type: {}", s)),
        }
    }
}

/// Kind of video item in the semantic hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// A single movie.
    Movie,
    /// A TV show (root of a season/episode subtree).
    Show,
    /// A season within a show.
    Season,
    /// A single episode within a season.
    Episode,
    /// A generic video with no further classification.
    Video,
    /// Extra content (trailer, featurette, deleted scene, ...).
    Extra,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movie => write!(f, "movie"),
            Self::Show => write!(f, "show"),
            Self::Season => write!(f, "season"),
            Self::Episode => write!(f, "episode"),
            Self::Video => write!(f, "video"),
            Self::Extra => write!(f, "extra"),
        }
    }
}

impl std::str::FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(Self::Movie),
            "show" => Ok(Self::Show),
            "season" => Ok(Self::Season),
            "episode" => Ok(Self::Episode),
            "video" => Ok(Self::Video),
            "extra" => Ok(Self::Extra),
            _ => Err(format!("Invalid item kind: {}", s)),
        }
    }
}

/// Persisted scan status of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// No scan in flight or queued.
    Idle,
    /// A scan has been requested and is waiting to run.
    Queued,
    /// A scan is currently running. A process restart coerces this back
    /// to `Queued`.
    Scanning,
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Queued => write!(f, "queued"),
            Self::Scanning => write!(f, "scanning"),
        }
    }
}

impl std::str::FromStr for ScanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "queued" => Ok(Self::Queued),
            "scanning" => Ok(Self::Scanning),
            _ => Err(format!("Invalid scan status: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_media_type_serialization() {
        let json = serde_json::to_string(&MediaType::Videos).unwrap();
        assert_eq!(json, r#""videos""#);

        let mt: MediaType = serde_json::from_str(r#""audio""#).unwrap();
        assert_eq!(mt, MediaType::Audio);
    }

    #[test]
    fn test_media_type_round_trip() {
        for mt in [MediaType::Videos, MediaType::Photos, MediaType::Audio] {
            assert_eq!(MediaType::from_str(&mt.to_string()).unwrap(), mt);
        }
    }

    #[test]
    fn test_item_kind_display() {
        assert_eq!(ItemKind::Movie.to_string(), "movie");
        assert_eq!(ItemKind::Show.to_string(), "show");
        assert_eq!(ItemKind::Season.to_string(), "season");
        assert_eq!(ItemKind::Episode.to_string(), "episode");
        assert_eq!(ItemKind::Video.to_string(), "video");
        assert_eq!(ItemKind::Extra.to_string(), "extra");
    }

    #[test]
    fn test_item_kind_round_trip() {
        for kind in [
            ItemKind::Movie,
            ItemKind::Show,
            ItemKind::Season,
            ItemKind::Episode,
            ItemKind::Video,
            ItemKind::Extra,
        ] {
            assert_eq!(ItemKind::from_str(&kind.to_string()).unwrap(), kind);
        }
    }

    #[test]
    fn test_scan_status_round_trip() {
        for status in [ScanStatus::Idle, ScanStatus::Queued, ScanStatus::Scanning] {
            assert_eq!(ScanStatus::from_str(&status.to_string()).unwrap(), status);
        }
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(MediaType::from_str("books").is_err());
        assert!(ItemKind::from_str("album").is_err());
        assert!(ScanStatus::from_str("done").is_err());
    }
}
