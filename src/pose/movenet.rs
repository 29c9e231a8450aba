//! MoveNet MultiPose, running on `tract`.
//!
//! The network takes an RGB `int32` tensor of shape `[1, H, W, 3]` and outputs `[1, 6, 56]`: up to
//! 6 people, each with 17 `(y, x, score)` keypoint triples followed by a bounding box
//! `(ymin, xmin, ymax, xmax)` and an overall person score. All coordinates are normalized to
//! `0.0..=1.0`.

use std::{path::Path, sync::Arc};

use anyhow::{bail, Context};
use tract_onnx::prelude::{
    tract_ndarray::{Array4, ArrayView2, Axis, Ix3},
    tvec, DatumType, Framework, Graph, InferenceFact, InferenceModelExt, SimplePlan, TValue,
    Tensor, TypedFact, TypedOp,
};

use super::{BodyPart, PersonPose, PoseEstimator};
use crate::image::{Image, Resolution};

type Model = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Keypoints emitted per person, in [`BodyPart`] order. The network has no neck keypoint.
const NUM_KEYPOINTS: usize = 17;
/// Floats per detected person: keypoint triples, bounding box, and score.
const DETECTION_LEN: usize = NUM_KEYPOINTS * 3 + 5;

const PARTS: [BodyPart; NUM_KEYPOINTS] = {
    use BodyPart::*;
    [
        Nose,
        LeftEye,
        RightEye,
        LeftEar,
        RightEar,
        LeftShoulder,
        RightShoulder,
        LeftElbow,
        RightElbow,
        LeftWrist,
        RightWrist,
        LeftHip,
        RightHip,
        LeftKnee,
        RightKnee,
        LeftAnkle,
        RightAnkle,
    ]
};

/// Multi-person pose estimator backed by a MoveNet MultiPose ONNX model.
pub struct MoveNet {
    model: Model,
    input_res: Resolution,
    threshold: f32,
}

impl MoveNet {
    /// Loads the model at `path` and prepares it for inputs of size `input_res`.
    ///
    /// Both dimensions of `input_res` must be multiples of 32. Keypoints and people scoring below
    /// `threshold` are reported as absent.
    pub fn load<P: AsRef<Path>>(
        path: P,
        input_res: Resolution,
        threshold: f32,
    ) -> anyhow::Result<Self> {
        Self::load_impl(path.as_ref(), input_res, threshold)
    }

    fn load_impl(path: &Path, input_res: Resolution, threshold: f32) -> anyhow::Result<Self> {
        if input_res.width() % 32 != 0 || input_res.height() % 32 != 0 {
            bail!("MoveNet input resolution must be a multiple of 32, got {input_res}");
        }

        let (h, w) = (input_res.height() as usize, input_res.width() as usize);
        let graph = tract_onnx::onnx()
            .model_for_path(path)
            .with_context(|| format!("failed to read pose model '{}'", path.display()))?
            .with_input_fact(0, InferenceFact::dt_shape(DatumType::I32, tvec!(1, h, w, 3)))?
            .into_optimized()
            .with_context(|| format!("failed to optimize pose model '{}'", path.display()))?;
        let model = SimplePlan::new(graph)?;

        log::info!(
            "loaded pose model {} at {input_res} (threshold {threshold})",
            path.display(),
        );

        Ok(Self {
            model,
            input_res,
            threshold,
        })
    }

    fn input_tensor(&self, frame: &Image) -> Tensor {
        let (h, w) = (
            self.input_res.height() as usize,
            self.input_res.width() as usize,
        );
        let (fw, fh) = (frame.width(), frame.height());

        // Nearest-neighbor resampling; the frame is stretched to the input aspect ratio.
        Array4::from_shape_fn((1, h, w, 3), |(_, y, x, c)| {
            let fx = ((x as f32 + 0.5) / w as f32 * fw as f32) as u32;
            let fy = ((y as f32 + 0.5) / h as f32 * fh as f32) as u32;
            let color = frame.get(fx.min(fw - 1), fy.min(fh - 1));
            i32::from([color.r(), color.g(), color.b()][c])
        })
        .into()
    }
}

impl PoseEstimator for MoveNet {
    fn process(&mut self, frame: &Image) -> anyhow::Result<Vec<PersonPose>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(Vec::new());
        }

        let input = self.input_tensor(frame);
        let outputs = self.model.run(tvec![TValue::from_const(Arc::new(input))])?;
        let detections = outputs[0].to_array_view::<f32>()?.into_dimensionality::<Ix3>()?;
        if detections.shape()[2] != DETECTION_LEN {
            bail!(
                "unexpected MoveNet output shape {:?} (expected [1, N, {DETECTION_LEN}])",
                detections.shape(),
            );
        }

        Ok(decode(
            detections.index_axis(Axis(0), 0),
            frame.resolution(),
            self.threshold,
        ))
    }
}

/// Converts raw MoveNet detections into poses in pixel coordinates of a `res`-sized frame.
fn decode(detections: ArrayView2<'_, f32>, res: Resolution, threshold: f32) -> Vec<PersonPose> {
    let (width, height) = (res.width() as f32, res.height() as f32);

    let mut poses = Vec::new();
    for det in detections.outer_iter() {
        if det[DETECTION_LEN - 1] < threshold {
            continue;
        }

        let mut pose = PersonPose::default();
        for (i, part) in PARTS.into_iter().enumerate() {
            let (y, x, score) = (det[i * 3], det[i * 3 + 1], det[i * 3 + 2]);
            if score >= threshold {
                pose.set(part, x * width, y * height);
            }
        }

        // The neck is the shoulder midpoint, like for networks that predict it directly.
        if let (Some([lx, ly]), Some([rx, ry])) = (
            pose.get(BodyPart::LeftShoulder),
            pose.get(BodyPart::RightShoulder),
        ) {
            pose.set(BodyPart::Neck, (lx + rx) * 0.5, (ly + ry) * 0.5);
        }

        poses.push(pose);
    }

    log::trace!("decoded {} poses", poses.len());
    poses
}
