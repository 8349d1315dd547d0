//! Exogenous settings: environment geometry, the driving field and global constraints.
//!
//! The environment oracle is [`ExogenousSettings::environment_clash`]. Each environment mesh is
//! tagged [`EnvironmentKind`] and interpreted according to [`EnvironmentMode`]:
//!
//! | kind      | `Collision`                     | `Inclusion`                            |
//! |-----------|---------------------------------|----------------------------------------|
//! | Void      | centroid inside                 | centroid inside                        |
//! | Solid     | centroid inside or surfaces hit | centroid inside or surfaces hit        |
//! | Container | same as Solid                   | not fully inside any container         |
//!
//! `Custom` delegates to a user [`EnvironmentCheck`].
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::assembly::Module;
use crate::field::FieldSampler;
use crate::geometry::{Aabb, CollisionMesh, CollisionOracle};

/// Slack used for centroid-inside-environment tests.
pub const ENVIRONMENT_TOLERANCE: f32 = 1e-4;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EnvironmentKind {
    /// Empty region modules must not occupy.
    #[default]
    Void,
    /// Obstacle modules must neither occupy nor touch.
    Solid,
    /// Boundary modules must stay inside when including.
    Container,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EnvironmentMode {
    #[default]
    Ignore,
    Collision,
    Inclusion,
    Custom,
}

impl TryFrom<u8> for EnvironmentMode {
    type Error = crate::error::Error;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => EnvironmentMode::Ignore,
            1 => EnvironmentMode::Collision,
            2 => EnvironmentMode::Inclusion,
            3 => EnvironmentMode::Custom,
            other => {
                return Err(crate::error::Error::InvalidConfig(format!(
                    "unknown environment mode code {other}"
                )))
            }
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnvironmentGeometry {
    pub mesh: CollisionMesh,
    pub kind: EnvironmentKind,
}

impl EnvironmentGeometry {
    pub fn new(mesh: CollisionMesh, kind: EnvironmentKind) -> Self {
        Self { mesh, kind }
    }
}

/// User-defined environment test used in [`EnvironmentMode::Custom`].
pub trait EnvironmentCheck: Send + Sync {
    /// Returns `true` when `module` clashes with the environment.
    fn clashes(&self, module: &Module, environment: &[EnvironmentGeometry]) -> bool;
}

impl<F> EnvironmentCheck for F
where
    F: Fn(&Module, &[EnvironmentGeometry]) -> bool + Send + Sync,
{
    fn clashes(&self, module: &Module, environment: &[EnvironmentGeometry]) -> bool {
        self(module, environment)
    }
}

#[derive(Clone, Default)]
pub struct ExogenousSettings {
    pub environment: Vec<EnvironmentGeometry>,
    pub mode: EnvironmentMode,
    pub custom: Option<Arc<dyn EnvironmentCheck>>,
    pub field: Option<Arc<dyn FieldSampler>>,
    /// Target value for scalar-field strategies.
    pub threshold: f32,
    /// Experimental bounded region; candidates outside it are rejected.
    pub sandbox: Option<Aabb>,
    /// Enables the per-module world-up constraint.
    pub world_z_lock: bool,
}

impl fmt::Debug for ExogenousSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExogenousSettings")
            .field("environment", &self.environment.len())
            .field("mode", &self.mode)
            .field("custom", &self.custom.is_some())
            .field("field", &self.field.is_some())
            .field("threshold", &self.threshold)
            .field("sandbox", &self.sandbox)
            .field("world_z_lock", &self.world_z_lock)
            .finish()
    }
}

impl ExogenousSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_environment(mut self, geometry: EnvironmentGeometry) -> Self {
        self.environment.push(geometry);
        self
    }

    pub fn with_mode(mut self, mode: EnvironmentMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_custom_check(mut self, check: impl EnvironmentCheck + 'static) -> Self {
        self.custom = Some(Arc::new(check));
        self.mode = EnvironmentMode::Custom;
        self
    }

    pub fn with_field(mut self, field: Arc<dyn FieldSampler>) -> Self {
        self.field = Some(field);
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_sandbox(mut self, sandbox: Aabb) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    pub fn with_world_z_lock(mut self, lock: bool) -> Self {
        self.world_z_lock = lock;
        self
    }

    pub fn field(&self) -> Option<&dyn FieldSampler> {
        self.field.as_deref()
    }

    /// Whether `module` clashes with the environment under the current mode.
    pub fn environment_clash(&self, module: &Module, collider: &dyn CollisionOracle) -> bool {
        match self.mode {
            EnvironmentMode::Ignore => false,
            EnvironmentMode::Custom => self
                .custom
                .as_ref()
                .is_some_and(|c| c.clashes(module, &self.environment)),
            EnvironmentMode::Collision => self
                .environment
                .iter()
                .any(|env| blocks(env, module, collider)),
            EnvironmentMode::Inclusion => {
                let mut has_container = false;
                let mut contained = false;
                for env in &self.environment {
                    match env.kind {
                        EnvironmentKind::Container => {
                            has_container = true;
                            contained = contained || encloses(&env.mesh, module, collider);
                        }
                        _ => {
                            if blocks(env, module, collider) {
                                return true;
                            }
                        }
                    }
                }
                has_container && !contained
            }
        }
    }
}

fn blocks(env: &EnvironmentGeometry, module: &Module, collider: &dyn CollisionOracle) -> bool {
    let inside = collider.point_inside(&env.mesh, module.centroid(), ENVIRONMENT_TOLERANCE);
    match env.kind {
        EnvironmentKind::Void => inside,
        EnvironmentKind::Solid | EnvironmentKind::Container => {
            inside || collider.intersects(&env.mesh, &module.offset_mesh)
        }
    }
}

fn encloses(container: &CollisionMesh, module: &Module, collider: &dyn CollisionOracle) -> bool {
    collider.point_inside(container, module.centroid(), ENVIRONMENT_TOLERANCE)
        && !collider.intersects(container, &module.offset_mesh)
}
