//! Typed, oriented connection ports and their occupancy state.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use glam::Affine3A;

use crate::assembly::ModuleId;
use crate::geometry::Frame;

/// Rotation angles (degrees) closer than this select the same receiver variant.
pub const ROTATION_TOLERANCE_DEG: f32 = 1e-3;

/// Connectivity state of a port.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Occupancy {
    /// Blocked by another module's geometry.
    Occluded,
    /// Free for rule-driven connection.
    #[default]
    Available,
    /// Joined to another port by a rule.
    Connected,
    /// Coincident with another free port by position, without a rule.
    Contact,
}

impl Occupancy {
    /// Signed integer code used by hosts (`-1`, `0`, `1`, `2`).
    pub fn code(self) -> i8 {
        match self {
            Occupancy::Occluded => -1,
            Occupancy::Available => 0,
            Occupancy::Connected => 1,
            Occupancy::Contact => 2,
        }
    }

    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            -1 => Some(Occupancy::Occluded),
            0 => Some(Occupancy::Available),
            1 => Some(Occupancy::Connected),
            2 => Some(Occupancy::Contact),
            _ => None,
        }
    }
}

/// A connection point on a module (a "handle").
///
/// `sender` is the frame used when the owning module is attached to someone else.
/// `receivers[i]` is the frame another module is attached onto for rotation variant `i`:
/// the sender frame rotated about its normal by `rotations[i]` degrees, then flipped.
#[derive(Clone, Debug, PartialEq)]
pub struct Port {
    pub sender: Frame,
    pub receivers: Vec<Frame>,
    pub rotations: Vec<f32>,
    pub kind: String,
    pub weight: f32,
    pub occupancy: Occupancy,
    pub neighbour_object: Option<ModuleId>,
    pub neighbour_port: Option<usize>,
}

impl Port {
    pub fn new(sender: Frame, kind: impl Into<String>, rotations: &[f32], weight: f32) -> Self {
        let receivers = rotations
            .iter()
            .map(|deg| sender.rotated_about_normal(*deg).flipped())
            .collect();
        Self {
            sender,
            receivers,
            rotations: rotations.to_vec(),
            kind: kind.into(),
            weight,
            occupancy: Occupancy::Available,
            neighbour_object: None,
            neighbour_port: None,
        }
    }

    /// Variant index for a rotation angle in degrees, compared modulo 360.
    pub fn rotation_index(&self, degrees: f32) -> Option<usize> {
        self.rotations.iter().position(|r| {
            let d = (r - degrees).rem_euclid(360.0);
            d < ROTATION_TOLERANCE_DEG || 360.0 - d < ROTATION_TOLERANCE_DEG
        })
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.occupancy == Occupancy::Available
    }

    pub fn transform(&mut self, xf: &Affine3A) {
        self.sender = self.sender.transformed(xf);
        for r in &mut self.receivers {
            *r = r.transformed(xf);
        }
    }

    pub(crate) fn connect(&mut self, module: ModuleId, port: usize, weight: f32) {
        self.occupancy = Occupancy::Connected;
        self.neighbour_object = Some(module);
        self.neighbour_port = Some(port);
        self.weight = weight;
    }

    pub(crate) fn touch(&mut self, module: ModuleId, port: usize) {
        self.occupancy = Occupancy::Contact;
        self.neighbour_object = Some(module);
        self.neighbour_port = Some(port);
    }

    pub(crate) fn occlude(&mut self, by: ModuleId) {
        self.occupancy = Occupancy::Occluded;
        self.neighbour_object = Some(by);
        self.neighbour_port = None;
    }

    pub(crate) fn release(&mut self) {
        self.occupancy = Occupancy::Available;
        self.neighbour_object = None;
        self.neighbour_port = None;
    }
}
