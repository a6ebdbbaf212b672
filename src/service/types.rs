//! Service layer types

use serde::{Deserialize, Serialize};

/// Structural element classes the detection model predicts.
///
/// The model head also emits background (id 0); it never leaves the
/// service layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementClass {
    Wall,
    Window,
    Door,
}

impl ElementClass {
    /// Total mapping from raw model class ids. Background and unrecognized
    /// ids return None; the caller drops the whole detection with its box.
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(ElementClass::Wall),
            2 => Some(ElementClass::Window),
            3 => Some(ElementClass::Door),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementClass::Wall => "wall",
            ElementClass::Window => "window",
            ElementClass::Door => "door",
        }
    }
}

/// One detected element. Box and class travel as a single record so the
/// box and label sequences cannot drift out of alignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanElement {
    pub class: ElementClass,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
}

impl PlanElement {
    /// Larger of the box's two dimensions, the scale heuristic used for the
    /// average door span.
    pub fn span(&self) -> f32 {
        (self.x2 - self.x1).abs().max((self.y2 - self.y1).abs())
    }
}

/// Full analysis of one uploaded plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanAnalysis {
    pub elements: Vec<PlanElement>,
    pub width: u32,
    pub height: u32,
    pub average_door_span: f32,
    pub inference_time_ms: u64,
}

/// Health check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResult {
    pub healthy: bool,
    pub version: String,
    pub model_loaded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_mapping_is_total() {
        assert_eq!(ElementClass::from_id(1), Some(ElementClass::Wall));
        assert_eq!(ElementClass::from_id(2), Some(ElementClass::Window));
        assert_eq!(ElementClass::from_id(3), Some(ElementClass::Door));
        assert_eq!(ElementClass::from_id(0), None);
        assert_eq!(ElementClass::from_id(99), None);
        assert_eq!(ElementClass::from_id(-1), None);
    }

    #[test]
    fn test_class_names() {
        assert_eq!(ElementClass::Wall.as_str(), "wall");
        assert_eq!(ElementClass::Window.as_str(), "window");
        assert_eq!(ElementClass::Door.as_str(), "door");
    }

    #[test]
    fn test_span_takes_larger_dimension() {
        let element = PlanElement {
            class: ElementClass::Door,
            x1: 0.0,
            y1: 0.0,
            x2: 4.0,
            y2: 10.0,
            score: 0.9,
        };
        assert_eq!(element.span(), 10.0);
    }
}
