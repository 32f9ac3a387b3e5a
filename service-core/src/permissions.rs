//! Hierarchical role-based permission engine.
//!
//! Evaluates "is `action` granted to `variant` on `layer`" against an
//! immutable policy tree built once at process start. Pure function over that
//! tree: no I/O, no interior mutability.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Account roles known to the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    SuperAdmin,
    SchoolAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SuperAdmin",
            Role::SchoolAdmin => "SchoolAdmin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SuperAdmin" => Ok(Role::SuperAdmin),
            "SchoolAdmin" => Ok(Role::SchoolAdmin),
            other => Err(format!("unknown role {other}")),
        }
    }
}

/// The action ceiling a layer node concedes to a variant.
#[derive(Debug, Clone)]
pub struct Grant {
    pub anyone_can: String,
}

impl Grant {
    fn new(anyone_can: &str) -> Self {
        Self {
            anyone_can: anyone_can.to_string(),
        }
    }
}

/// One node of the policy tree: a default grant, per-role overrides, and
/// nested sub-layers (typically field-level sub-resources).
#[derive(Debug, Clone, Default)]
pub struct Layer {
    default: Option<Grant>,
    overrides: HashMap<String, Grant>,
    children: HashMap<String, Layer>,
}

impl Layer {
    pub fn with_default(anyone_can: &str) -> Self {
        Self {
            default: Some(Grant::new(anyone_can)),
            ..Self::default()
        }
    }

    pub fn role(mut self, role: Role, anyone_can: &str) -> Self {
        self.overrides
            .insert(role.as_str().to_string(), Grant::new(anyone_can));
        self
    }

    pub fn child(mut self, name: &str, layer: Layer) -> Self {
        self.children.insert(name.to_string(), layer);
        self
    }
}

/// Stateless evaluator over the policy tree and the ordinal action scale.
#[derive(Debug, Clone)]
pub struct PermissionEngine {
    layers: HashMap<String, Layer>,
    actions: HashMap<String, i8>,
}

impl PermissionEngine {
    pub fn new(layers: HashMap<String, Layer>, actions: HashMap<String, i8>) -> Self {
        Self { layers, actions }
    }

    /// Grant iff the variant's ceiling on `layer` is at least as strong as
    /// `action` on the ordinal scale.
    ///
    /// A missing layer, a layer with neither a matching override nor a
    /// default, or an unknown action name all evaluate to not-granted; an
    /// undefined lookup must never read as an explicit grant. `is_owner` is
    /// threaded for per-resource ownership overrides but does not yet branch.
    pub fn is_granted(&self, layer: &str, variant: &str, action: &str, _is_owner: bool) -> bool {
        let Some(node) = self.resolve(layer) else {
            return false;
        };
        let Some(grant) = node.overrides.get(variant).or(node.default.as_ref()) else {
            return false;
        };
        match (self.scale(action), self.scale(&grant.anyone_can)) {
            (Some(requested), Some(ceiling)) => requested <= ceiling,
            _ => false,
        }
    }

    /// Walk a dotted layer path (`"classroom.student"`) into the tree.
    fn resolve(&self, path: &str) -> Option<&Layer> {
        let mut parts = path.split('.');
        let mut node = self.layers.get(parts.next()?)?;
        for part in parts {
            node = node.children.get(part)?;
        }
        Some(node)
    }

    fn scale(&self, action: &str) -> Option<i8> {
        self.actions.get(action).copied()
    }
}

/// The ordinal action scale: `blocked < none < read < create < audit < config`.
pub fn action_scale() -> HashMap<String, i8> {
    HashMap::from([
        ("blocked".to_string(), -1),
        ("none".to_string(), 1),
        ("read".to_string(), 2),
        ("create".to_string(), 3),
        ("audit".to_string(), 4),
        ("config".to_string(), 5),
    ])
}

/// The static policy tree for the school-management domain.
///
/// Students and classrooms (and their reference fields) are ceded to
/// SchoolAdmin, schools to SuperAdmin; everyone else bottoms out at `none`.
pub fn school_policy() -> PermissionEngine {
    let layers = HashMap::from([
        (
            "student".to_string(),
            Layer::with_default("none")
                .role(Role::SchoolAdmin, "create")
                .child(
                    "classroom",
                    Layer::with_default("none").role(Role::SchoolAdmin, "create"),
                ),
        ),
        (
            "classroom".to_string(),
            Layer::with_default("none")
                .role(Role::SchoolAdmin, "create")
                .child(
                    "student",
                    Layer::with_default("none").role(Role::SchoolAdmin, "create"),
                ),
        ),
        (
            "school".to_string(),
            Layer::with_default("none")
                .role(Role::SuperAdmin, "create")
                .child(
                    "classroom",
                    Layer::with_default("none").role(Role::SuperAdmin, "create"),
                ),
        ),
    ]);
    PermissionEngine::new(layers, action_scale())
}

/// Per-module mapping from payload field to the sub-layer gating writes to it.
pub type FieldPolicy = HashMap<String, String>;

/// Field policies for the modules that register one; modules absent from this
/// map pass the permission stage unchecked.
pub fn school_field_policies() -> HashMap<String, FieldPolicy> {
    HashMap::from([
        (
            "student".to_string(),
            FieldPolicy::from([("classrooms".to_string(), "student.classroom".to_string())]),
        ),
        (
            "classroom".to_string(),
            FieldPolicy::from([("students".to_string(), "classroom.student".to_string())]),
        ),
        (
            "school".to_string(),
            FieldPolicy::from([("classrooms".to_string(), "school.classroom".to_string())]),
        ),
    ])
}
