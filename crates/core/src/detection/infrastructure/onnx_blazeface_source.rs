use std::path::Path;

use crate::detection::domain::face_geometry_source::{
    DetectOptions, DetectionError, FaceGeometrySource, ModelLoadError,
};
use crate::shared::face_geometry::{FaceGeometry, Point, Rect};
use crate::shared::frame::Frame;

use super::execution_provider::{platform_execution_providers, platform_provider_name};

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 128;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.3;

/// Number of BlazeFace anchors (short-range model).
const NUM_ANCHORS: usize = 896;

/// Values per anchor in the regressor output: box (4) + 6 keypoints (12).
const REGRESSOR_STRIDE: usize = 16;

const NUM_KEYPOINTS: usize = 6;

/// BlazeFace face geometry source backed by an ONNX Runtime session.
///
/// Produces bounding boxes and the model's six keypoints (eyes, nose tip,
/// mouth, ear tragions) as landmarks. Requests with `with_descriptors` set
/// are rejected, since the model has no embedding head.
pub struct OnnxBlazefaceSource {
    session: Option<ort::session::Session>,
    anchors: Vec<[f32; 2]>,
}

impl OnnxBlazefaceSource {
    /// Creates an unloaded source; call `load_models` before detecting.
    pub fn new() -> Self {
        Self {
            session: None,
            anchors: generate_anchors(),
        }
    }
}

impl Default for OnnxBlazefaceSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FaceGeometrySource for OnnxBlazefaceSource {
    fn load_models(&mut self, model_path: &Path) -> Result<(), ModelLoadError> {
        if !model_path.exists() {
            return Err(ModelLoadError::NotFound(model_path.to_path_buf()));
        }
        let session = ort::session::Session::builder()
            .map_err(|e| load_error(model_path, e))?
            .with_execution_providers(platform_execution_providers())
            .map_err(|e| load_error(model_path, e))?
            .commit_from_file(model_path)
            .map_err(|e| load_error(model_path, e))?;
        log::info!(
            "Loaded BlazeFace model from {} ({})",
            model_path.display(),
            platform_provider_name()
        );
        self.session = Some(session);
        Ok(())
    }

    fn detect(
        &mut self,
        frame: &Frame,
        options: &DetectOptions,
    ) -> Result<Vec<FaceGeometry>, DetectionError> {
        if options.with_descriptors {
            return Err(DetectionError::Unsupported("face descriptors"));
        }
        let session = self.session.as_mut().ok_or(DetectionError::NotReady)?;
        let fw = frame.width();
        let fh = frame.height();
        if fw == 0 || fh == 0 {
            return Ok(Vec::new());
        }
        if frame.channels() < 3 {
            return Err(DetectionError::Inference(format!(
                "expected RGB frame, got {} channels",
                frame.channels()
            )));
        }

        let input_tensor = preprocess(frame, INPUT_SIZE);
        let input_value = ort::value::Tensor::from_array(input_tensor).map_err(inference_error)?;
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(inference_error)?;

        // regressors: [1, 896, 16], classificators: [1, 896, 1]
        if outputs.len() < 2 {
            return Err(DetectionError::Inference(format!(
                "BlazeFace model expected 2 outputs, got {}",
                outputs.len()
            )));
        }

        let regressors = outputs[0]
            .try_extract_array::<f32>()
            .map_err(inference_error)?;
        let scores = outputs[1]
            .try_extract_array::<f32>()
            .map_err(inference_error)?;
        let reg_data = regressors
            .as_slice()
            .ok_or(DetectionError::NoResult)?;
        let score_data = scores.as_slice().ok_or(DetectionError::NoResult)?;

        let mut raw_dets = decode(
            reg_data,
            score_data,
            &self.anchors,
            options.min_confidence as f32,
            fw,
            fh,
        );
        let kept = nms(&mut raw_dets, NMS_IOU_THRESH);

        Ok(kept
            .into_iter()
            .map(|d| {
                let face = FaceGeometry::new(Rect::new(d.x1, d.y1, d.x2 - d.x1, d.y2 - d.y1));
                if options.with_landmarks {
                    face.with_landmarks(d.keypoints)
                } else {
                    face
                }
            })
            .collect())
    }
}

fn load_error(path: &Path, e: impl std::fmt::Display) -> ModelLoadError {
    ModelLoadError::Load {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

fn inference_error(e: impl std::fmt::Display) -> DetectionError {
    DetectionError::Inference(e.to_string())
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Resize frame to `size × size` and normalize to [0,1] NCHW float32.
fn preprocess(frame: &Frame, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));

    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    tensor
}

// ---------------------------------------------------------------------------
// Anchors and decoding (BlazeFace short-range)
// ---------------------------------------------------------------------------

/// The short-range model uses two feature maps, 16×16 and 8×8, with 2 and 6
/// anchors per cell respectively.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)]; // (stride, anchors_per_cell)
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, num) in &strides {
        let grid_size = INPUT_SIZE as usize / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..num {
                    anchors.push([cx, cy]);
                }
            }
        }
    }

    anchors
}

#[derive(Clone, Debug)]
struct RawDet {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    score: f64,
    keypoints: Vec<Point>,
}

/// Decodes anchor-relative boxes and keypoints into frame pixel coordinates.
fn decode(
    reg_data: &[f32],
    score_data: &[f32],
    anchors: &[[f32; 2]],
    min_confidence: f32,
    fw: u32,
    fh: u32,
) -> Vec<RawDet> {
    let (fw_f, fh_f) = (fw as f32, fh as f32);
    let input = INPUT_SIZE as f32;
    let mut dets = Vec::new();
    let num_anchors = anchors.len().min(NUM_ANCHORS);

    for (i, &raw_score) in score_data.iter().enumerate().take(num_anchors) {
        let score = sigmoid(raw_score);
        if score < min_confidence {
            continue;
        }

        let anchor = &anchors[i];
        let offset = i * REGRESSOR_STRIDE;
        if offset + REGRESSOR_STRIDE > reg_data.len() {
            break;
        }
        let reg = &reg_data[offset..offset + REGRESSOR_STRIDE];

        let cx = anchor[0] + reg[0] / input;
        let cy = anchor[1] + reg[1] / input;
        let w = reg[2] / input;
        let h = reg[3] / input;

        let keypoints = (0..NUM_KEYPOINTS)
            .map(|k| {
                let kx = anchor[0] + reg[4 + 2 * k] / input;
                let ky = anchor[1] + reg[5 + 2 * k] / input;
                Point::new((kx * fw_f) as f64, (ky * fh_f) as f64)
            })
            .collect();

        dets.push(RawDet {
            x1: ((cx - w / 2.0) * fw_f).max(0.0) as f64,
            y1: ((cy - h / 2.0) * fh_f).max(0.0) as f64,
            x2: ((cx + w / 2.0) * fw_f).min(fw_f) as f64,
            y2: ((cy + h / 2.0) * fh_f).min(fh_f) as f64,
            score: score as f64,
            keypoints,
        });
    }

    dets.retain(|d| d.x2 > d.x1 && d.y2 > d.y1);
    dets
}

fn nms(dets: &mut [RawDet], iou_thresh: f64) -> Vec<RawDet> {
    dets.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if !suppressed[j] && bbox_iou(&dets[i], &dets[j]) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

fn bbox_iou(a: &RawDet, b: &RawDet) -> f64 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    inter / (area_a + area_b - inter)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
