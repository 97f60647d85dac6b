use std::fmt;

use serde::{Deserialize, Serialize};

pub use crate::constants::splits::ALL_SPLITS;

/// Mutually exclusive output partitions assigned per sample key via the
/// metadata table. The set is closed and known at configuration time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitLabel {
    /// Training split.
    Train,
    /// Validation split.
    Val,
}

impl SplitLabel {
    /// Directory name used for this split's shard sequence.
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitLabel::Train => "train",
            SplitLabel::Val => "val",
        }
    }

    /// Parse a metadata category string, `None` for labels outside the set.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "train" => Some(SplitLabel::Train),
            "val" => Some(SplitLabel::Val),
            _ => None,
        }
    }
}

impl fmt::Display for SplitLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip_through_strings() {
        for label in ALL_SPLITS {
            assert_eq!(SplitLabel::parse(label.as_str()), Some(label));
        }
        assert_eq!(SplitLabel::parse("test"), None);
        assert_eq!(SplitLabel::parse("Train"), None);
    }
}
