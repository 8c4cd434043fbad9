//! Layout configuration
//!
//! Engine scalars plus an ordered list of force entries. Every field
//! has a default, so a config file only needs to name what it changes. The
//! default force list reproduces the classic map overlay: links, charge,
//! collision at 1.5x the node radius, and x/y pulls toward each node's
//! projected coordinate.

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, LayoutResult};
use crate::forces::{
    CenterForce, CollideForce, DEFAULT_CHARGE, DEFAULT_DISTANCE_MIN, DEFAULT_POSITION_STRENGTH,
    DEFAULT_THETA, Force, FreeTarget, LinkForce, ManyBodyForce, PositionForce,
};
use crate::geo::Point;
use crate::graph::{DEFAULT_NODE_RADIUS, LinkClass};
use crate::simulation::NamedForce;

/// Default number of ticks for alpha to decay from 1 to `alpha_min`
pub const DEFAULT_DECAY_TICKS: u32 = 300;

/// Engine scalars and force list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Initial alpha
    pub alpha: f64,
    /// The simulation is settled once alpha drops below this
    pub alpha_min: f64,
    /// Explicit decay rate; derived from `decay_ticks` when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha_decay: Option<f64>,
    pub decay_ticks: u32,
    /// Value alpha decays toward
    pub alpha_target: f64,
    /// Fraction of velocity kept each tick
    pub velocity_decay: f64,
    /// Jitter seed
    pub seed: u32,
    /// Collision radius for nodes that do not set one
    pub default_radius: f64,
    /// Move free nodes with their anchors when the view changes
    pub carry_followers: bool,
    pub forces: Vec<ForceSpec>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            alpha_min: 0.001,
            alpha_decay: None,
            decay_ticks: DEFAULT_DECAY_TICKS,
            alpha_target: 0.0,
            velocity_decay: 0.6,
            seed: 1,
            default_radius: DEFAULT_NODE_RADIUS,
            carry_followers: false,
            forces: ForceSpec::defaults(),
        }
    }
}

impl SimulationConfig {
    /// Config with the default scalars and no forces
    pub fn without_forces() -> Self {
        Self {
            forces: Vec::new(),
            ..Self::default()
        }
    }

    /// Decay rate actually applied each tick
    pub fn effective_alpha_decay(&self) -> f64 {
        self.alpha_decay
            .unwrap_or_else(|| 1.0 - self.alpha_min.powf(1.0 / f64::from(self.decay_ticks)))
    }

    /// Check the engine scalars
    pub fn validate(&self) -> LayoutResult<()> {
        let in_unit = |name: &str, v: f64| {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(LayoutError::config(format!(
                    "{name} must be within [0, 1], got {v}"
                )))
            }
        };
        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return Err(LayoutError::config(format!(
                "alpha must be non-negative, got {}",
                self.alpha
            )));
        }
        in_unit("alpha_min", self.alpha_min)?;
        in_unit("alpha_target", self.alpha_target)?;
        in_unit("velocity_decay", self.velocity_decay)?;
        if self.decay_ticks == 0 {
            return Err(LayoutError::config("decay_ticks must be at least 1"));
        }
        in_unit("alpha_decay", self.effective_alpha_decay())?;
        if !(self.default_radius.is_finite() && self.default_radius > 0.0) {
            return Err(LayoutError::config(format!(
                "default_radius must be positive, got {}",
                self.default_radius
            )));
        }
        for spec in &self.forces {
            if let ForceSpec::Link(link) = spec {
                link.check()?;
            }
        }
        Ok(())
    }

    /// Build the configured forces, in order
    pub fn build_forces(&self) -> Vec<NamedForce> {
        self.forces.iter().map(ForceSpec::build).collect()
    }
}

/// Configuration of one force contributor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ForceSpec {
    Link(LinkSpec),
    ManyBody(ManyBodySpec),
    Collide(CollideSpec),
    X(PositionSpec),
    Y(PositionSpec),
    Center(CenterSpec),
}

impl ForceSpec {
    /// link, charge, collide (x1.5), x, y
    pub fn defaults() -> Vec<ForceSpec> {
        vec![
            ForceSpec::Link(LinkSpec::default()),
            ForceSpec::ManyBody(ManyBodySpec::default()),
            ForceSpec::Collide(CollideSpec {
                radius_scale: 1.5,
                ..CollideSpec::default()
            }),
            ForceSpec::X(PositionSpec::default()),
            ForceSpec::Y(PositionSpec::default()),
        ]
    }

    /// Name used when the entry does not set one
    pub fn default_name(&self) -> &'static str {
        match self {
            ForceSpec::Link(_) => "link",
            ForceSpec::ManyBody(_) => "charge",
            ForceSpec::Collide(_) => "collide",
            ForceSpec::X(_) => "x",
            ForceSpec::Y(_) => "y",
            ForceSpec::Center(_) => "center",
        }
    }

    /// Explicit name, if the entry sets one
    pub fn name(&self) -> Option<&str> {
        match self {
            ForceSpec::Link(spec) => spec.name.as_deref(),
            ForceSpec::ManyBody(spec) => spec.name.as_deref(),
            ForceSpec::Collide(spec) => spec.name.as_deref(),
            ForceSpec::X(spec) | ForceSpec::Y(spec) => spec.name.as_deref(),
            ForceSpec::Center(spec) => spec.name.as_deref(),
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            ForceSpec::Link(spec) => spec.enabled,
            ForceSpec::ManyBody(spec) => spec.enabled,
            ForceSpec::Collide(spec) => spec.enabled,
            ForceSpec::X(spec) | ForceSpec::Y(spec) => spec.enabled,
            ForceSpec::Center(spec) => spec.enabled,
        }
    }

    pub fn build(&self) -> NamedForce {
        let force: Box<dyn Force> = match self {
            ForceSpec::Link(spec) => Box::new(spec.to_force()),
            ForceSpec::ManyBody(spec) => Box::new(spec.to_force()),
            ForceSpec::Collide(spec) => Box::new(spec.to_force()),
            ForceSpec::X(spec) => Box::new(spec.to_force(PositionForce::x())),
            ForceSpec::Y(spec) => Box::new(spec.to_force(PositionForce::y())),
            ForceSpec::Center(spec) => Box::new(spec.to_force()),
        };
        let name = self.name().unwrap_or(self.default_name());
        NamedForce::new(name, force).enabled(self.enabled())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub enabled: bool,
    /// Fixed rest length
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    /// Rest length as the endpoint radius sum times this factor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius_scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strength: Option<f64>,
    pub iterations: usize,
    /// Link classes to act on; all when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<LinkClass>>,
}

impl Default for LinkSpec {
    fn default() -> Self {
        Self {
            name: None,
            enabled: true,
            distance: None,
            radius_scale: None,
            strength: None,
            iterations: 1,
            classes: None,
        }
    }
}

impl LinkSpec {
    /// A rest length is either fixed or derived from the radii, not both
    fn check(&self) -> LayoutResult<()> {
        if self.distance.is_some() && self.radius_scale.is_some() {
            return Err(LayoutError::config(format!(
                "link force `{}` sets both distance and radius_scale",
                self.name.as_deref().unwrap_or("link")
            )));
        }
        Ok(())
    }

    fn to_force(&self) -> LinkForce {
        let mut force = LinkForce::new().iterations(self.iterations);
        if let Some(scale) = self.radius_scale {
            force = force.distance_from_radii(scale);
        } else if let Some(distance) = self.distance {
            force = force.distance(distance);
        }
        if let Some(strength) = self.strength {
            force = force.strength(strength);
        }
        if let Some(classes) = &self.classes {
            force = force.only(classes.iter().copied());
        }
        force
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManyBodySpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub enabled: bool,
    pub strength: f64,
    pub theta: f64,
    pub distance_min: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_max: Option<f64>,
}

impl Default for ManyBodySpec {
    fn default() -> Self {
        Self {
            name: None,
            enabled: true,
            strength: DEFAULT_CHARGE,
            theta: DEFAULT_THETA,
            distance_min: DEFAULT_DISTANCE_MIN,
            distance_max: None,
        }
    }
}

impl ManyBodySpec {
    fn to_force(&self) -> ManyBodyForce {
        let force = ManyBodyForce::new()
            .strength(self.strength)
            .theta(self.theta)
            .distance_min(self.distance_min);
        match self.distance_max {
            Some(max) => force.distance_max(max),
            None => force,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollideSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub enabled: bool,
    pub radius_scale: f64,
    pub strength: f64,
    pub iterations: usize,
}

impl Default for CollideSpec {
    fn default() -> Self {
        Self {
            name: None,
            enabled: true,
            radius_scale: 1.0,
            strength: 1.0,
            iterations: 1,
        }
    }
}

impl CollideSpec {
    fn to_force(&self) -> CollideForce {
        CollideForce::new()
            .radius_scale(self.radius_scale)
            .strength(self.strength)
            .iterations(self.iterations)
    }
}

/// Where free nodes are pulled: `home`, `disabled`, or a number
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetSpec {
    Value(f64),
    Mode(TargetMode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMode {
    Home,
    Disabled,
}

impl From<TargetSpec> for FreeTarget {
    fn from(spec: TargetSpec) -> Self {
        match spec {
            TargetSpec::Value(v) => FreeTarget::Value(v),
            TargetSpec::Mode(TargetMode::Home) => FreeTarget::Home,
            TargetSpec::Mode(TargetMode::Disabled) => FreeTarget::Disabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub enabled: bool,
    pub strength: f64,
    pub free_target: TargetSpec,
}

impl Default for PositionSpec {
    fn default() -> Self {
        Self {
            name: None,
            enabled: true,
            strength: DEFAULT_POSITION_STRENGTH,
            free_target: TargetSpec::Mode(TargetMode::Home),
        }
    }
}

impl PositionSpec {
    fn to_force(&self, base: PositionForce) -> PositionForce {
        base.strength(self.strength)
            .free_target(self.free_target.into())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CenterSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub enabled: bool,
    pub x: f64,
    pub y: f64,
    pub strength: f64,
}

impl Default for CenterSpec {
    fn default() -> Self {
        Self {
            name: None,
            enabled: true,
            x: 0.0,
            y: 0.0,
            strength: 1.0,
        }
    }
}

impl CenterSpec {
    fn to_force(&self) -> CenterForce {
        CenterForce::new(Point::new(self.x, self.y)).strength(self.strength)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_decay_reaches_alpha_min_in_300_ticks() {
        let config = SimulationConfig::default();
        let decay = config.effective_alpha_decay();
        assert!((decay - 0.0228).abs() < 1e-4);

        let after = (1.0 - decay).powi(300);
        assert!((after - config.alpha_min).abs() < 1e-9);
    }

    #[test]
    fn default_forces_match_map_overlay() {
        let names: Vec<String> = SimulationConfig::default()
            .build_forces()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["link", "charge", "collide", "x", "y"]);
    }

    #[test]
    fn parses_yaml_with_partitioned_links() {
        let yaml = r#"
velocity_decay: 0.5
seed: 42
forces:
  - type: link
    name: anchors
    classes: [anchor_to_anchor]
    distance: 80
    strength: 0.05
  - type: link
    name: followers
    classes: [anchor_to_free, free_to_free]
    radius_scale: 2.0
  - type: many_body
    strength: -200
  - type: x
    free_target: disabled
  - type: y
    free_target: 120
    enabled: false
"#;
        let config: SimulationConfig = serde_yaml::from_str(yaml).expect("Should parse config");

        assert_eq!(config.velocity_decay, 0.5);
        assert_eq!(config.seed, 42);
        assert_eq!(config.alpha, 1.0);
        assert_eq!(config.forces.len(), 5);
        match &config.forces[0] {
            ForceSpec::Link(spec) => {
                assert_eq!(spec.name.as_deref(), Some("anchors"));
                assert_eq!(spec.classes, Some(vec![LinkClass::AnchorToAnchor]));
                assert_eq!(spec.distance, Some(80.0));
                assert_eq!(spec.iterations, 1);
            }
            other => panic!("Expected link force, got {other:?}"),
        }
        match &config.forces[3] {
            ForceSpec::X(spec) => {
                assert_eq!(spec.free_target, TargetSpec::Mode(TargetMode::Disabled));
            }
            other => panic!("Expected x force, got {other:?}"),
        }
        match &config.forces[4] {
            ForceSpec::Y(spec) => {
                assert_eq!(spec.free_target, TargetSpec::Value(120.0));
                assert!(!spec.enabled);
            }
            other => panic!("Expected y force, got {other:?}"),
        }

        let built = config.build_forces();
        assert_eq!(built[0].name, "anchors");
        assert_eq!(built[2].name, "charge");
        assert!(!built[4].enabled);
    }

    #[test]
    fn parses_json_config() {
        let json = r#"{"alpha": 0.5, "forces": [{"type": "collide", "radius_scale": 1.5, "iterations": 3}]}"#;
        let config: SimulationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.alpha, 0.5);
        assert_eq!(
            config.forces,
            vec![ForceSpec::Collide(CollideSpec {
                radius_scale: 1.5,
                iterations: 3,
                ..CollideSpec::default()
            })]
        );
    }

    #[test]
    fn unknown_force_type_is_rejected() {
        let yaml = "forces:\n  - type: gravity\n";
        assert!(serde_yaml::from_str::<SimulationConfig>(yaml).is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_scalars() {
        let mut config = SimulationConfig::default();
        assert!(config.validate().is_ok());

        config.velocity_decay = 1.5;
        assert!(config.validate().is_err());

        let config = SimulationConfig {
            alpha: -1.0,
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());

        let config = SimulationConfig {
            alpha_decay: Some(2.0),
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());

        let config = SimulationConfig {
            decay_ticks: 0,
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn link_with_distance_and_radius_scale_is_rejected() {
        let yaml = r#"
forces:
  - type: link
    name: followers
    distance: 40
    radius_scale: 2.0
"#;
        let config: SimulationConfig = serde_yaml::from_str(yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, LayoutError::Configuration(_)));
        assert!(err.to_string().contains("followers"), "{err}");
    }
}
