//! Post-placement obstruction and contact resolution.
use std::sync::Arc;

use tracing::debug;

use crate::assembly::ModuleId;
use crate::engine::{Assemblage, EngineConfig};
use crate::geometry::{CollisionMesh, CollisionOracle, Frame, Ray};

/// Occupancy changes made by one obstruction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObstructionReport {
    /// Ports newly marked occluded, counting both sides.
    pub occluded: usize,
    /// Port pairs newly marked in contact.
    pub contacts: usize,
}

impl ObstructionReport {
    pub fn changed(&self) -> bool {
        self.occluded > 0 || self.contacts > 0
    }
}

/// Whether the outward probe of the port at `frame` hits `mesh`.
///
/// The probe starts `probe_offset` along the normal and runs `probe_length`; a probe ending
/// inside the mesh counts as a hit, so flush geometry blocks the port too.
pub(crate) fn probe_hits(
    collider: &dyn CollisionOracle,
    frame: &Frame,
    mesh: &CollisionMesh,
    config: &EngineConfig,
) -> bool {
    let normal = frame.z_axis();
    let ray = Ray::new(
        frame.origin + normal * config.probe_offset,
        normal,
        config.probe_length,
    );
    collider.ray_intersects(&ray, mesh) || collider.point_inside(mesh, ray.end(), 0.0)
}

impl Assemblage {
    /// Updates port occupancy between `new_id` and the given neighbours.
    pub(crate) fn resolve_obstructions(
        &mut self,
        new_id: ModuleId,
        neighbours: &[ModuleId],
    ) -> ObstructionReport {
        let mut report = ObstructionReport::default();
        let Some(mut new) = self.modules.remove(&new_id) else {
            return report;
        };
        let collider = Arc::clone(&self.collider);
        let config = &self.config;

        for &nid in neighbours {
            if nid == new_id {
                continue;
            }
            let Some(neighbour) = self.modules.get_mut(&nid) else {
                continue;
            };

            for q in 0..neighbour.ports.len() {
                if !neighbour.ports[q].is_free() {
                    continue;
                }
                let origin = neighbour.ports[q].sender.origin;
                let touching = new.free_ports().find(|&p| {
                    new.ports[p].sender.origin.distance(origin) <= config.contact_tolerance
                });
                if let Some(p) = touching {
                    neighbour.ports[q].touch(new_id, p);
                    new.ports[p].touch(nid, q);
                    report.contacts += 1;
                    continue;
                }
                if probe_hits(
                    collider.as_ref(),
                    &neighbour.ports[q].sender,
                    &new.collision_mesh,
                    config,
                ) {
                    neighbour.ports[q].occlude(new_id);
                    new.occluded_neighbours.push((nid, q));
                    report.occluded += 1;
                }
            }

            for p in 0..new.ports.len() {
                if !new.ports[p].is_free() {
                    continue;
                }
                if probe_hits(
                    collider.as_ref(),
                    &new.ports[p].sender,
                    &neighbour.collision_mesh,
                    config,
                ) {
                    new.ports[p].occlude(nid);
                    neighbour.occluded_neighbours.push((new_id, p));
                    report.occluded += 1;
                }
            }
        }

        if report.changed() {
            debug!(
                "Module {}: {} port(s) occluded, {} contact(s).",
                new_id, report.occluded, report.contacts
            );
        }
        self.modules.insert(new_id, new);
        report
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::geometry::MeshCollider;

    #[test]
    fn probe_hits_nearby_and_flush_geometry() {
        let collider = MeshCollider::default();
        let config = EngineConfig::default();
        let port = Frame::from_normal(Vec3::new(0.5, 0.0, 0.0), Vec3::X).unwrap();

        let near = CollisionMesh::cuboid(Vec3::new(1.1, 0.0, 0.0), Vec3::splat(0.5));
        assert!(probe_hits(&collider, &port, &near, &config));

        let flush = CollisionMesh::cuboid(Vec3::new(1.0, 0.0, 0.0), Vec3::splat(0.5));
        assert!(probe_hits(&collider, &port, &flush, &config));

        let far = CollisionMesh::cuboid(Vec3::new(2.0, 0.0, 0.0), Vec3::splat(0.5));
        assert!(!probe_hits(&collider, &port, &far, &config));

        let behind = CollisionMesh::cuboid(Vec3::new(-1.0, 0.0, 0.0), Vec3::splat(0.5));
        assert!(!probe_hits(&collider, &port, &behind, &config));
    }

    #[test]
    fn report_changed_only_with_updates() {
        assert!(!ObstructionReport::default().changed());
        assert!(ObstructionReport {
            occluded: 0,
            contacts: 1
        }
        .changed());
    }
}
