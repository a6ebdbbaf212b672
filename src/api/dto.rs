//! REST API request/response data transfer objects

use serde::{Deserialize, Serialize};

use crate::service::types::PlanAnalysis;

/// One detected bounding box in x/y convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointDto {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// Class label paired with the point at the same index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassNameDto {
    pub name: String,
}

/// Analysis response. Field casing is part of the public contract and is
/// what downstream consumers parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub points: Vec<PointDto>,
    pub classes: Vec<ClassNameDto>,
    #[serde(rename = "Width")]
    pub width: u32,
    #[serde(rename = "Height")]
    pub height: u32,
    #[serde(rename = "averageDoor")]
    pub average_door: f32,
}

impl From<&PlanAnalysis> for AnalyzeResponse {
    fn from(analysis: &PlanAnalysis) -> Self {
        // Both vectors come off the same paired records, so index i of
        // points always matches index i of classes.
        let points = analysis
            .elements
            .iter()
            .map(|e| PointDto {
                x1: e.x1,
                y1: e.y1,
                x2: e.x2,
                y2: e.y2,
            })
            .collect();

        let classes = analysis
            .elements
            .iter()
            .map(|e| ClassNameDto {
                name: e.class.as_str().to_string(),
            })
            .collect();

        Self {
            points,
            classes,
            width: analysis.width,
            height: analysis.height,
            average_door: analysis.average_door_span,
        }
    }
}

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub env: String,
    pub model_loaded: bool,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: &str, code: &str) -> Self {
        Self {
            error: error.to_string(),
            code: code.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::types::{ElementClass, PlanElement};

    fn sample_analysis() -> PlanAnalysis {
        PlanAnalysis {
            elements: vec![
                PlanElement {
                    class: ElementClass::Wall,
                    x1: 2.0,
                    y1: 1.0,
                    x2: 4.0,
                    y2: 3.0,
                    score: 0.95,
                },
                PlanElement {
                    class: ElementClass::Door,
                    x1: 0.0,
                    y1: 0.0,
                    x2: 4.0,
                    y2: 10.0,
                    score: 0.9,
                },
            ],
            width: 640,
            height: 480,
            average_door_span: 10.0,
            inference_time_ms: 12,
        }
    }

    #[test]
    fn test_points_and_classes_stay_index_aligned() {
        let response = AnalyzeResponse::from(&sample_analysis());
        assert_eq!(response.points.len(), response.classes.len());
        assert_eq!(response.classes[0].name, "wall");
        assert_eq!(response.classes[1].name, "door");
        assert_eq!(response.points[1].x2, 4.0);
        assert_eq!(response.points[1].y2, 10.0);
    }

    #[test]
    fn test_wire_field_names() {
        let response = AnalyzeResponse::from(&sample_analysis());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["Width"], 640);
        assert_eq!(json["Height"], 480);
        assert_eq!(json["averageDoor"], 10.0);
        assert_eq!(json["points"][0]["x1"], 2.0);
        assert_eq!(json["points"][0]["y1"], 1.0);
        assert_eq!(json["classes"][0]["name"], "wall");
        assert!(json.get("inference_time_ms").is_none());
    }
}
