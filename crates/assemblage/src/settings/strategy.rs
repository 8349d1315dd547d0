//! Receiver and sender selection strategies.
//!
//! Each strategy pairs a value computed per item (module or candidate) with a rule that picks
//! one index from those values. Hosts that marshal numeric selectors can use the `TryFrom<u8>`
//! conversions; the codes are listed on each variant.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// How an index is chosen from a list of computed values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionRule {
    /// Uniform random index; values are ignored.
    Random,
    /// Index of the smallest value.
    Min,
    /// Index of the largest value.
    Max,
    /// The last index; values are ignored.
    Last,
    /// Random index drawn proportionally to the values.
    WeightedRandom,
}

/// Strategy for picking the receiver among available modules.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ReceiverSelection {
    /// Code 0.
    #[default]
    Random,
    /// Code 1: closest scalar-field sample to the threshold.
    ScalarFieldNearest,
    /// Code 2: interpolated scalar-field sample closest to the threshold.
    ScalarFieldInterpolated,
    /// Code 3: densest neighbourhood (sum of neighbour weights within the collision radius).
    Density,
    /// Code 4: always extend the most recently added module.
    Sequential,
}

impl ReceiverSelection {
    pub fn selection(self) -> SelectionRule {
        match self {
            ReceiverSelection::Random => SelectionRule::Random,
            ReceiverSelection::ScalarFieldNearest | ReceiverSelection::ScalarFieldInterpolated => {
                SelectionRule::Min
            }
            ReceiverSelection::Density => SelectionRule::Max,
            ReceiverSelection::Sequential => SelectionRule::Last,
        }
    }

    pub fn requires_field(self) -> bool {
        matches!(
            self,
            ReceiverSelection::ScalarFieldNearest | ReceiverSelection::ScalarFieldInterpolated
        )
    }
}

impl TryFrom<u8> for ReceiverSelection {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Error> {
        Ok(match code {
            0 => ReceiverSelection::Random,
            1 => ReceiverSelection::ScalarFieldNearest,
            2 => ReceiverSelection::ScalarFieldInterpolated,
            3 => ReceiverSelection::Density,
            4 => ReceiverSelection::Sequential,
            other => {
                return Err(Error::InvalidConfig(format!(
                    "unknown receiver selection code {other}"
                )))
            }
        })
    }
}

/// Strategy for picking the winning candidate for a receiver.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SenderSelection {
    /// Code 0.
    #[default]
    Random,
    /// Code 1: smallest bounding-box volume of candidate and receiver together.
    MinBoxVolume,
    /// Code 2: smallest bounding-box diagonal of candidate and receiver together.
    MinBoxDiagonal,
    /// Code 3: closest scalar-field sample to the threshold.
    ScalarFieldNearest,
    /// Code 4: interpolated scalar-field sample closest to the threshold.
    ScalarFieldInterpolated,
    /// Code 5: direction best aligned with the closest field vector.
    VectorFieldNearest,
    /// Code 6: direction best aligned with the interpolated field vector.
    VectorFieldInterpolated,
    /// Code 7: as code 5, ignoring the sign of the alignment.
    VectorFieldBidirectionalNearest,
    /// Code 8: as code 6, ignoring the sign of the alignment.
    VectorFieldBidirectionalInterpolated,
    /// Code 9: random draw weighted by rule weight.
    WeightedRandom,
}

impl SenderSelection {
    pub fn selection(self) -> SelectionRule {
        match self {
            SenderSelection::Random => SelectionRule::Random,
            SenderSelection::WeightedRandom => SelectionRule::WeightedRandom,
            _ => SelectionRule::Min,
        }
    }

    pub fn requires_field(self) -> bool {
        !matches!(
            self,
            SenderSelection::Random
                | SenderSelection::MinBoxVolume
                | SenderSelection::MinBoxDiagonal
                | SenderSelection::WeightedRandom
        )
    }
}

impl TryFrom<u8> for SenderSelection {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Error> {
        Ok(match code {
            0 => SenderSelection::Random,
            1 => SenderSelection::MinBoxVolume,
            2 => SenderSelection::MinBoxDiagonal,
            3 => SenderSelection::ScalarFieldNearest,
            4 => SenderSelection::ScalarFieldInterpolated,
            5 => SenderSelection::VectorFieldNearest,
            6 => SenderSelection::VectorFieldInterpolated,
            7 => SenderSelection::VectorFieldBidirectionalNearest,
            8 => SenderSelection::VectorFieldBidirectionalInterpolated,
            9 => SenderSelection::WeightedRandom,
            other => {
                return Err(Error::InvalidConfig(format!(
                    "unknown sender selection code {other}"
                )))
            }
        })
    }
}
