//! Plan Service - Core business logic
//!
//! Orchestrates detection and door-span analytics over paired
//! (box, class) records.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::engine::detector::{Detect, DetectError, RawDetection};

use super::types::*;

/// Floor-plan analysis service, generic over the detection backend.
pub struct PlanService<D: Detect> {
    detector: Arc<D>,
}

impl<D: Detect> PlanService<D> {
    pub fn new(detector: Arc<D>) -> Self {
        Self { detector }
    }

    /// Analyze an uploaded plan image.
    ///
    /// Inference is synchronous and runs on the blocking pool; the detector
    /// serializes access to the model internally.
    pub async fn analyze(&self, image_data: &[u8]) -> Result<PlanAnalysis, DetectError> {
        let start = Instant::now();

        let detector = self.detector.clone();
        let image_data = image_data.to_vec();
        let detected = tokio::task::spawn_blocking(move || detector.detect(&image_data))
            .await
            .map_err(|e| DetectError::Inference(anyhow::anyhow!(e)))??;

        let inference_time_ms = start.elapsed().as_millis() as u64;

        let total = detected.detections.len();
        let elements: Vec<PlanElement> =
            detected.detections.iter().filter_map(pair_element).collect();

        info!(
            "Analyzed {}x{} plan: {} elements ({} unrecognized dropped) in {}ms",
            detected.width,
            detected.height,
            elements.len(),
            total - elements.len(),
            inference_time_ms
        );

        let average_door_span = average_door_span(&elements);

        Ok(PlanAnalysis {
            elements,
            width: detected.width,
            height: detected.height,
            average_door_span,
            inference_time_ms,
        })
    }

    /// Get health status
    pub fn health(&self) -> HealthResult {
        HealthResult {
            healthy: true,
            version: env!("CARGO_PKG_VERSION").to_string(),
            model_loaded: true,
        }
    }
}

/// Pair a raw detection with its class label. Unrecognized ids drop the
/// whole record, so boxes and labels stay aligned by construction.
fn pair_element(raw: &RawDetection) -> Option<PlanElement> {
    ElementClass::from_id(raw.class_id).map(|class| PlanElement {
        class,
        x1: raw.x1,
        y1: raw.y1,
        x2: raw.x2,
        y2: raw.y2,
        score: raw.score,
    })
}

/// Mean of each door's larger dimension; 0.0 when no doors are present.
pub fn average_door_span(elements: &[PlanElement]) -> f32 {
    let mut total = 0.0f32;
    let mut count = 0usize;

    for element in elements {
        if element.class == ElementClass::Door {
            total += element.span();
            count += 1;
        }
    }

    if count == 0 {
        0.0
    } else {
        total / count as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(class_id: i64, x1: f32, y1: f32, x2: f32, y2: f32) -> RawDetection {
        RawDetection {
            x1,
            y1,
            x2,
            y2,
            class_id,
            score: 0.9,
        }
    }

    #[test]
    fn test_pairing_drops_unrecognized_ids_with_their_boxes() {
        let detections = vec![
            raw(1, 0.0, 0.0, 10.0, 10.0),
            raw(2, 10.0, 10.0, 20.0, 20.0),
            raw(3, 20.0, 20.0, 30.0, 30.0),
            raw(99, 30.0, 30.0, 40.0, 40.0),
        ];

        let elements: Vec<PlanElement> = detections.iter().filter_map(pair_element).collect();

        let names: Vec<&str> = elements.iter().map(|e| e.class.as_str()).collect();
        assert_eq!(names, vec!["wall", "window", "door"]);

        // The dropped id takes its box with it; the door keeps its own
        assert_eq!(elements.len(), 3);
        assert_eq!(elements[2].x1, 20.0);
    }

    #[test]
    fn test_average_door_span_zero_doors() {
        let elements = vec![
            pair_element(&raw(1, 0.0, 0.0, 100.0, 5.0)).unwrap(),
            pair_element(&raw(2, 0.0, 0.0, 10.0, 10.0)).unwrap(),
        ];
        assert_eq!(average_door_span(&elements), 0.0);
        assert_eq!(average_door_span(&[]), 0.0);
    }

    #[test]
    fn test_average_door_span_single_door() {
        // Model-space box rows 0..10, cols 0..4: span is the larger side
        let elements = vec![pair_element(&raw(3, 0.0, 0.0, 4.0, 10.0)).unwrap()];
        assert_eq!(average_door_span(&elements), 10.0);
    }

    #[test]
    fn test_average_door_span_ignores_walls_and_windows() {
        let elements = vec![
            pair_element(&raw(1, 0.0, 0.0, 500.0, 5.0)).unwrap(),
            pair_element(&raw(3, 0.0, 0.0, 4.0, 10.0)).unwrap(),
            pair_element(&raw(3, 0.0, 0.0, 20.0, 6.0)).unwrap(),
        ];
        assert_eq!(average_door_span(&elements), 15.0);
    }
}
