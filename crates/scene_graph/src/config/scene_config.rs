//! Scene graph configuration
//!
//! Loaded once at startup through the [`Config`] trait. Order fields are
//! written by variant name; any other name fails to parse.

use serde::{Deserialize, Serialize};

use super::Config;
use crate::foundation::math::{AxisOrder, CompositionOrder};

/// Behavior switches for a [`SceneGraph`](crate::scene::SceneGraph)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// When false, draw ignores any frustum and never culls
    pub culling_enabled: bool,
    /// Axis order given to newly created nodes
    pub default_axis_order: AxisOrder,
    /// Composition order given to newly created nodes
    pub default_composition_order: CompositionOrder,
    /// Node arena pre-allocation
    pub initial_capacity: usize,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            culling_enabled: true,
            default_axis_order: AxisOrder::default(),
            default_composition_order: CompositionOrder::default(),
            initial_capacity: 64,
        }
    }
}

impl Config for SceneConfig {}

impl SceneConfig {
    /// Builder pattern: toggle frustum culling
    pub fn with_culling(mut self, enabled: bool) -> Self {
        self.culling_enabled = enabled;
        self
    }

    /// Builder pattern: set the orders used for new nodes
    pub fn with_default_orders(
        mut self,
        axis_order: AxisOrder,
        composition_order: CompositionOrder,
    ) -> Self {
        self.default_axis_order = axis_order;
        self.default_composition_order = composition_order;
        self
    }
}
