//! Floor-plan element detector
//!
//! Runs the exported detection graph over OpenVINO. The graph takes one
//! mean-centered NCHW image and emits three tensors for the batch of one:
//! rois `[N,4]` as (row_min, col_min, row_max, col_max) in input pixel
//! space, class ids `[N]`, and scores `[N]`. Proposal filtering and NMS
//! happen inside the graph.

use std::sync::Arc;

use image::GenericImageView;
use ndarray::Array4;
use openvino::{ElementType, Shape, Tensor};
use parking_lot::Mutex;
use thiserror::Error;

use super::loader::PlanModel;
use super::preprocess::{self, ResizeInfo};

/// Detection failure, split so the API layer can report undecodable uploads
/// as client errors and inference faults as server errors.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("failed to decode image: {0}")]
    Decode(#[source] anyhow::Error),
    #[error("inference failed: {0}")]
    Inference(#[source] anyhow::Error),
}

/// One raw detection in original-image pixel space, x along columns and
/// y along rows.
#[derive(Debug, Clone)]
pub struct RawDetection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub class_id: i64,
    pub score: f32,
}

/// Detections for a single image together with its decoded dimensions.
#[derive(Debug, Clone)]
pub struct Detections {
    pub detections: Vec<RawDetection>,
    pub width: u32,
    pub height: u32,
}

/// Detection backend seam. Lets the HTTP layer run against a stub in tests.
pub trait Detect: Send + Sync + 'static {
    fn detect(&self, image_data: &[u8]) -> Result<Detections, DetectError>;
}

/// Floor-plan element detector bound to the loaded model.
pub struct PlanDetector {
    model: Arc<PlanModel>,
    confidence_threshold: f32,
    // The compiled model context is not assumed safe for concurrent
    // inference; requests take this lock for the full forward pass.
    infer_lock: Mutex<()>,
}

struct RawOutputs {
    rois: Vec<f32>,
    class_ids: Vec<f32>,
    scores: Vec<f32>,
}

impl PlanDetector {
    pub fn new(model: Arc<PlanModel>, confidence_threshold: f32) -> Self {
        Self {
            model,
            confidence_threshold,
            infer_lock: Mutex::new(()),
        }
    }

    fn run_inference(&self, input: &Array4<f32>) -> anyhow::Result<RawOutputs> {
        let input_size = self.model.input_size() as i64;

        let _guard = self.infer_lock.lock();

        let mut request = self.model.compiled().create_infer_request()?;

        let input_shape = Shape::new(&[1, 3, input_size, input_size])?;
        let mut input_tensor = Tensor::new(ElementType::F32, &input_shape)?;

        let input_data = input.as_slice().unwrap();
        unsafe {
            let tensor_data = input_tensor.get_raw_data_mut()?.as_mut_ptr() as *mut f32;
            std::ptr::copy_nonoverlapping(input_data.as_ptr(), tensor_data, input_data.len());
        }

        request.set_input_tensor(&input_tensor)?;
        request.infer()?;

        let rois = read_tensor_f32(&request.get_output_tensor_by_index(0)?)?;
        let class_ids = read_tensor_f32(&request.get_output_tensor_by_index(1)?)?;
        let scores = read_tensor_f32(&request.get_output_tensor_by_index(2)?)?;

        Ok(RawOutputs {
            rois,
            class_ids,
            scores,
        })
    }
}

impl Detect for PlanDetector {
    /// Detect wall/window/door instances in an encoded image.
    fn detect(&self, image_data: &[u8]) -> Result<Detections, DetectError> {
        let image = preprocess::decode_image(image_data).map_err(DetectError::Decode)?;

        let (orig_w, orig_h) = image.dimensions();
        let input_size = self.model.input_size();
        let resize_info = ResizeInfo::new((orig_w, orig_h), (input_size, input_size));

        let input_tensor = preprocess::preprocess_for_detection(&image, input_size);

        let raw = self
            .run_inference(&input_tensor)
            .map_err(DetectError::Inference)?;

        let detections = collect_detections(&raw, self.confidence_threshold, &resize_info);

        tracing::info!("Detected {} elements above threshold", detections.len());

        Ok(Detections {
            detections,
            width: orig_w,
            height: orig_h,
        })
    }
}

/// Read tensor data as f32 vector
fn read_tensor_f32(tensor: &Tensor) -> anyhow::Result<Vec<f32>> {
    let shape = tensor.get_shape()?;
    let dims: Vec<i64> = shape.get_dimensions().to_vec();
    let total_elements: i64 = dims.iter().product();

    let data: Vec<f32> = unsafe {
        let ptr = tensor.get_raw_data()?.as_ptr() as *const f32;
        std::slice::from_raw_parts(ptr, total_elements as usize).to_vec()
    };

    Ok(data)
}

/// Walk the roi/class/score triples, keep confident detections, and map
/// their boxes from model-input row/col space into original-image x/y space.
fn collect_detections(
    raw: &RawOutputs,
    confidence_threshold: f32,
    resize_info: &ResizeInfo,
) -> Vec<RawDetection> {
    let count = raw.rois.len() / 4;
    let mut detections = Vec::new();

    for i in 0..count {
        let score = raw.scores.get(i).copied().unwrap_or(0.0);
        if score < confidence_threshold {
            continue;
        }

        let class_id = raw.class_ids.get(i).copied().unwrap_or(0.0) as i64;

        let row_min = raw.rois[i * 4];
        let col_min = raw.rois[i * 4 + 1];
        let row_max = raw.rois[i * 4 + 2];
        let col_max = raw.rois[i * 4 + 3];

        // x follows the column axis, y the row axis
        let (x1, y1) = resize_info.to_original(col_min, row_min);
        let (x2, y2) = resize_info.to_original(col_max, row_max);

        let x1 = x1.max(0.0).min(resize_info.original_width as f32);
        let y1 = y1.max(0.0).min(resize_info.original_height as f32);
        let x2 = x2.max(0.0).min(resize_info.original_width as f32);
        let y2 = y2.max(0.0).min(resize_info.original_height as f32);

        detections.push(RawDetection {
            x1,
            y1,
            x2,
            y2,
            class_id,
            score,
        });
    }

    detections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_resize() -> ResizeInfo {
        ResizeInfo::new((1024, 1024), (1024, 1024))
    }

    #[test]
    fn test_row_col_boxes_relabel_to_x_y() {
        let raw = RawOutputs {
            rois: vec![1.0, 2.0, 3.0, 4.0],
            class_ids: vec![1.0],
            scores: vec![0.9],
        };

        let detections = collect_detections(&raw, 0.7, &identity_resize());
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].x1, 2.0);
        assert_eq!(detections[0].y1, 1.0);
        assert_eq!(detections[0].x2, 4.0);
        assert_eq!(detections[0].y2, 3.0);
        assert_eq!(detections[0].class_id, 1);
    }

    #[test]
    fn test_low_confidence_detections_are_skipped() {
        let raw = RawOutputs {
            rois: vec![0.0, 0.0, 10.0, 10.0, 5.0, 5.0, 20.0, 20.0],
            class_ids: vec![1.0, 3.0],
            scores: vec![0.2, 0.95],
        };

        let detections = collect_detections(&raw, 0.7, &identity_resize());
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_id, 3);
    }

    #[test]
    fn test_boxes_are_clamped_to_image_bounds() {
        let raw = RawOutputs {
            rois: vec![-5.0, -10.0, 2000.0, 2000.0],
            class_ids: vec![2.0],
            scores: vec![0.8],
        };

        let detections = collect_detections(&raw, 0.7, &identity_resize());
        assert_eq!(detections[0].x1, 0.0);
        assert_eq!(detections[0].y1, 0.0);
        assert_eq!(detections[0].x2, 1024.0);
        assert_eq!(detections[0].y2, 1024.0);
    }

    #[test]
    fn test_boxes_map_back_through_letterbox() {
        // 512x512 source letterboxed into 1024: scale 2, no offsets
        let resize_info = ResizeInfo::new((512, 512), (1024, 1024));
        let raw = RawOutputs {
            rois: vec![100.0, 200.0, 300.0, 400.0],
            class_ids: vec![3.0],
            scores: vec![0.9],
        };

        let detections = collect_detections(&raw, 0.7, &resize_info);
        assert_eq!(detections[0].x1, 100.0);
        assert_eq!(detections[0].y1, 50.0);
        assert_eq!(detections[0].x2, 200.0);
        assert_eq!(detections[0].y2, 150.0);
    }
}
