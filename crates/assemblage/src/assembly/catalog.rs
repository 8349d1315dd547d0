//! Module catalog: prototypes indexed by type id and by name.
use std::collections::HashMap;

use crate::assembly::module::Module;
use crate::assembly::ModuleTypeId;
use crate::error::{Error, Result};
use crate::geometry::Frame;

/// Immutable set of prototypes. A prototype's position in the catalog is its type id.
#[derive(Clone, Debug)]
pub struct Catalog {
    modules: Vec<Module>,
    names: HashMap<String, ModuleTypeId>,
}

impl Catalog {
    /// Builds a catalog, assigning type ids in order. Names must be unique.
    pub fn new(modules: Vec<Module>) -> Result<Self> {
        if modules.is_empty() {
            return Err(Error::EmptyCatalog);
        }
        let mut names = HashMap::with_capacity(modules.len());
        let mut modules = modules;
        for (type_id, module) in modules.iter_mut().enumerate() {
            if names.insert(module.name.clone(), type_id).is_some() {
                return Err(Error::DuplicateModuleName {
                    name: module.name.clone(),
                });
            }
            module.type_id = type_id;
            module.id = None;
        }
        Ok(Self { modules, names })
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn get(&self, type_id: ModuleTypeId) -> Option<&Module> {
        self.modules.get(type_id)
    }

    pub fn type_of(&self, name: &str) -> Option<ModuleTypeId> {
        self.names.get(name).copied()
    }

    pub fn by_name(&self, name: &str) -> Option<&Module> {
        self.type_of(name).and_then(|t| self.get(t))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    /// Clones the named prototype and moves its reference frame onto `frame`.
    pub fn instantiate(&self, name: &str, frame: &Frame) -> Result<Module> {
        let proto = self.by_name(name).ok_or_else(|| {
            Error::InvalidConfig(format!("catalog has no module named '{name}'"))
        })?;
        let xf = proto.reference_frame.map_onto(frame).ok_or_else(|| {
            Error::InvalidConfig(format!("cannot place module '{name}' on a degenerate frame"))
        })?;
        Ok(proto.transformed(&xf))
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::geometry::CollisionMesh;

    fn proto(name: &str) -> Module {
        Module::new(
            name,
            CollisionMesh::cuboid(Vec3::ZERO, Vec3::splat(0.5)),
            Frame::WORLD,
            Vec::new(),
        )
    }

    #[test]
    fn type_ids_follow_catalog_order() {
        let c = Catalog::new(vec![proto("A"), proto("B")]).unwrap();
        assert_eq!(c.type_of("B"), Some(1));
        assert_eq!(c.get(1).unwrap().type_id, 1);
        assert_eq!(c.type_of("C"), None);
    }

    #[test]
    fn duplicate_and_empty_catalogs_fail() {
        assert!(matches!(Catalog::new(Vec::new()), Err(Error::EmptyCatalog)));
        assert!(matches!(
            Catalog::new(vec![proto("A"), proto("A")]),
            Err(Error::DuplicateModuleName { .. })
        ));
    }

    #[test]
    fn instantiate_moves_prototype() {
        let c = Catalog::new(vec![proto("A")]).unwrap();
        let target = Frame::new(Vec3::new(0.0, 4.0, 0.0), glam::Quat::IDENTITY);
        let m = c.instantiate("A", &target).unwrap();
        assert!(m.centroid().abs_diff_eq(Vec3::new(0.0, 4.0, 0.0), 1e-6));
        assert!(c.instantiate("missing", &target).is_err());
    }
}
