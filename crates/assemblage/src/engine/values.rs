//! Per-item values feeding receiver and sender selection.
use std::collections::HashMap;

use glam::Vec3;
use mint::{Point3, Vector3};

use crate::assembly::{Module, ModuleId, Rule};
use crate::field::FieldSampler;
use crate::settings::{ExogenousSettings, ReceiverSelection, SenderSelection};
use crate::spatial::SpatialIndex;

/// Receiver value of a single module. Density is neighbourhood-dependent and handled by
/// [`density_contributions`] or incrementally by the engine; it yields 0 here.
pub(crate) fn receiver_value(
    strategy: ReceiverSelection,
    module: &Module,
    exogenous: &ExogenousSettings,
) -> f32 {
    match strategy {
        ReceiverSelection::Random | ReceiverSelection::Sequential | ReceiverSelection::Density => {
            0.0
        }
        ReceiverSelection::ScalarFieldNearest => {
            scalar_distance(exogenous, module.centroid(), false)
        }
        ReceiverSelection::ScalarFieldInterpolated => {
            scalar_distance(exogenous, module.centroid(), true)
        }
    }
}

/// Sender value of a candidate attached to `receiver` through `rule`. Lower is better except
/// for [`SenderSelection::WeightedRandom`], where the value is the draw weight.
pub(crate) fn sender_value(
    strategy: SenderSelection,
    candidate: &Module,
    receiver: &Module,
    rule: &Rule,
    exogenous: &ExogenousSettings,
) -> f32 {
    match strategy {
        SenderSelection::Random => 0.0,
        SenderSelection::MinBoxVolume => receiver
            .collision_mesh
            .aabb()
            .union(candidate.collision_mesh.aabb())
            .volume(),
        SenderSelection::MinBoxDiagonal => receiver
            .collision_mesh
            .aabb()
            .union(candidate.collision_mesh.aabb())
            .diagonal(),
        SenderSelection::ScalarFieldNearest => {
            scalar_distance(exogenous, candidate.centroid(), false)
        }
        SenderSelection::ScalarFieldInterpolated => {
            scalar_distance(exogenous, candidate.centroid(), true)
        }
        SenderSelection::VectorFieldNearest => alignment(exogenous, candidate, false, false),
        SenderSelection::VectorFieldInterpolated => alignment(exogenous, candidate, true, false),
        SenderSelection::VectorFieldBidirectionalNearest => {
            alignment(exogenous, candidate, false, true)
        }
        SenderSelection::VectorFieldBidirectionalInterpolated => {
            alignment(exogenous, candidate, true, true)
        }
        SenderSelection::WeightedRandom => rule.weight as f32,
    }
}

/// Heuristic set a module reads in field-driven mode: the first integer weight at its centroid.
pub(crate) fn field_rule_set(field: &dyn FieldSampler, position: Vec3) -> i32 {
    field
        .closest_integer_weights(Point3::from(position))
        .first()
        .copied()
        .unwrap_or(0)
}

fn scalar_distance(exogenous: &ExogenousSettings, position: Vec3, interpolated: bool) -> f32 {
    let Some(field) = exogenous.field() else {
        return 0.0;
    };
    let p = Point3::from(position);
    let sample = if interpolated {
        field.interpolated_scalar(p)
    } else {
        field.closest_scalar(p)
    };
    (sample - exogenous.threshold).abs()
}

/// Angle in radians between the module direction and the field vector at its centroid.
fn alignment(
    exogenous: &ExogenousSettings,
    module: &Module,
    interpolated: bool,
    bidirectional: bool,
) -> f32 {
    let Some(field) = exogenous.field() else {
        return 0.0;
    };
    let p = Point3::from(module.centroid());
    let v: Vector3<f32> = if interpolated {
        field.interpolated_vector(p)
    } else {
        field.closest_vector(p)
    };
    let v = Vec3::from(v);
    if v.length_squared() <= f32::EPSILON || module.direction.length_squared() <= f32::EPSILON {
        return std::f32::consts::FRAC_PI_2;
    }
    let angle = module.direction.angle_between(v);
    if bidirectional {
        angle.min(std::f32::consts::PI - angle)
    } else {
        angle
    }
}

/// Summed neighbour weight within `radius` for every module, accumulated into a private map
/// and merged by the caller. Every module contributes its weight to each neighbour it finds.
pub(crate) fn density_contributions<'a>(
    modules: impl Iterator<Item = (&'a ModuleId, &'a Module)>,
    index: &dyn SpatialIndex,
    radius: f32,
) -> HashMap<ModuleId, f32> {
    let mut sums = HashMap::new();
    for (id, module) in modules {
        for n in index.query_within_radius(module.centroid(), radius) {
            if n != *id {
                *sums.entry(n).or_insert(0.0) += module.weight;
            }
        }
    }
    sums
}

pub(crate) fn merge_density(
    mut a: HashMap<ModuleId, f32>,
    b: HashMap<ModuleId, f32>,
) -> HashMap<ModuleId, f32> {
    for (id, w) in b {
        *a.entry(id).or_insert(0.0) += w;
    }
    a
}
