mod common;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use image::RgbImage;
use ndarray::{Array, IxDyn};

use common::{Script, ScriptedTransport};
use sortcam::data::{
    ClassPriority, Frame, LabelStore, ModelConfig, PlcConfig, SystemConfig,
};
use sortcam::detector::{Inference, ModelLayout, RawOutputs, SsdOrder};
use sortcam::error::DetectorError;
use sortcam::input::Camera;
use sortcam::output::Display;
use sortcam::pipeline::{FrameOutcome, Pipeline};
use sortcam::plc::PlcLink;

/////////////////////
// Test scaffolding
/////////////////////

struct StubEngine {
    outputs: VecDeque<Result<RawOutputs, DetectorError>>,
    layout: ModelLayout,
}

impl Inference for StubEngine {
    fn infer(&mut self, _frame: &Frame) -> Result<RawOutputs, DetectorError> {
        self.outputs
            .pop_front()
            .expect("stub engine ran out of scripted outputs")
    }

    fn layout(&self) -> ModelLayout {
        self.layout
    }
}

struct StubCamera {
    frames: VecDeque<Frame>,
}

impl StubCamera {
    fn with_frames(count: usize) -> Self {
        let frames = (0..count)
            .map(|_| Frame::new(RgbImage::new(100, 100)))
            .collect();
        Self { frames }
    }
}

impl Camera for StubCamera {
    fn capture(&mut self) -> Result<Option<Frame>> {
        Ok(self.frames.pop_front())
    }
}

struct CountingDisplay {
    shown: Arc<AtomicUsize>,
}

impl Display for CountingDisplay {
    fn show(&mut self, _frame: &Frame) -> Result<()> {
        self.shown.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn labels() -> LabelStore {
    LabelStore::from_vec(vec![
        "ok".to_string(),
        "reject".to_string(),
        "stone".to_string(),
    ])
}

fn config() -> SystemConfig {
    SystemConfig {
        model: ModelConfig {
            conf_threshold: 0.5,
            iou_threshold: 0.45,
            ..ModelConfig::default()
        },
        plc: PlcConfig {
            retry_interval_secs: 1,
            connect_timeout_ms: 100,
            idle_code: 0,
            ..PlcConfig::default()
        },
        priorities: vec![
            ClassPriority {
                label: "ok".to_string(),
                priority: 1,
                code: 0,
            },
            ClassPriority {
                label: "reject".to_string(),
                priority: 2,
                code: 1,
            },
            ClassPriority {
                label: "stone".to_string(),
                priority: 3,
                code: 2,
            },
        ],
        ..SystemConfig::default()
    }
}

/// Single anchor-free tensor `[1, 6, N]` (4 box values + 2 class scores are
/// enough for these tests; class ids beyond 1 use wider rows).
fn anchor_free(rows: &[[f32; 7]]) -> RawOutputs {
    let n = rows.len();
    let mut data = vec![0.0f32; 7 * n];
    for (j, row) in rows.iter().enumerate() {
        for (k, v) in row.iter().enumerate() {
            data[k * n + j] = *v;
        }
    }
    let tensor = Array::from_shape_vec(IxDyn(&[1, 7, n]), data).unwrap();
    let mut outputs = RawOutputs::new();
    outputs.push("output0", tensor);
    outputs
}

fn ssd(boxes: &[[f32; 4]], classes: &[f32], scores: &[f32], count: f32) -> RawOutputs {
    let n = scores.len();
    let mut outputs = RawOutputs::new();
    outputs.push(
        "TFLite_Detection_PostProcess",
        Array::from_shape_vec(IxDyn(&[1, n, 4]), boxes.iter().flatten().copied().collect())
            .unwrap(),
    );
    outputs.push(
        "TFLite_Detection_PostProcess:1",
        Array::from_shape_vec(IxDyn(&[1, n]), classes.to_vec()).unwrap(),
    );
    outputs.push(
        "TFLite_Detection_PostProcess:2",
        Array::from_shape_vec(IxDyn(&[1, n]), scores.to_vec()).unwrap(),
    );
    outputs.push(
        "TFLite_Detection_PostProcess:3",
        Array::from_shape_vec(IxDyn(&[1]), vec![count]).unwrap(),
    );
    outputs
}

fn build_pipeline(
    engine: StubEngine,
    camera: StubCamera,
    script: Arc<Script>,
) -> (Pipeline<StubEngine>, Arc<AtomicUsize>) {
    let cfg = config();
    let plc = PlcLink::connect(&cfg.plc, Box::new(ScriptedTransport::new(script))).unwrap();
    let shown = Arc::new(AtomicUsize::new(0));
    let display = CountingDisplay {
        shown: Arc::clone(&shown),
    };
    let pipeline = Pipeline::new(
        engine,
        Box::new(camera),
        Box::new(display),
        plc,
        labels(),
        &cfg,
    );
    (pipeline, shown)
}

/////////////////////
// Tests
/////////////////////

#[test]
fn detections_actuate_and_idle_frames_send_the_idle_code() {
    // frame 1: one confident stone (class 2); frame 2: nothing above threshold
    let engine = StubEngine {
        outputs: VecDeque::from(vec![
            Ok(anchor_free(&[[0.5, 0.5, 0.2, 0.2, 0.1, 0.1, 0.9]])),
            Ok(anchor_free(&[[0.5, 0.5, 0.2, 0.2, 0.2, 0.1, 0.1]])),
        ]),
        layout: ModelLayout::AnchorFree,
    };
    let script = Script::new(true);
    let (mut pipeline, shown) = build_pipeline(engine, StubCamera::with_frames(2), script.clone());

    pipeline.run().unwrap();

    assert_eq!(
        script.recorded_writes(),
        vec![vec![0x00, 0x02], vec![0x00, 0x00]]
    );
    assert_eq!(shown.load(Ordering::SeqCst), 2);
    pipeline.shutdown();
}

#[test]
fn recoverable_inference_failure_skips_the_frame() {
    let engine = StubEngine {
        outputs: VecDeque::from(vec![
            Err(DetectorError::Inference("runtime hiccup".to_string())),
            Ok(anchor_free(&[[0.5, 0.5, 0.2, 0.2, 0.1, 0.9, 0.1]])),
        ]),
        layout: ModelLayout::AnchorFree,
    };
    let script = Script::new(true);
    let (mut pipeline, shown) = build_pipeline(engine, StubCamera::with_frames(2), script.clone());

    pipeline.run().unwrap();

    // only the second frame produced a write (class 1 -> code 1)
    assert_eq!(script.recorded_writes(), vec![vec![0x00, 0x01]]);
    assert_eq!(shown.load(Ordering::SeqCst), 1);
    pipeline.shutdown();
}

#[test]
fn actuation_failure_does_not_stall_the_loop() {
    let engine = StubEngine {
        outputs: VecDeque::from(vec![
            Ok(anchor_free(&[[0.5, 0.5, 0.2, 0.2, 0.1, 0.1, 0.9]])),
            Ok(anchor_free(&[[0.5, 0.5, 0.2, 0.2, 0.1, 0.1, 0.9]])),
        ]),
        layout: ModelLayout::AnchorFree,
    };
    // controller down the whole time
    let script = Script::new(false);
    let (mut pipeline, shown) = build_pipeline(engine, StubCamera::with_frames(2), script.clone());

    pipeline.run().unwrap();

    assert!(script.recorded_writes().is_empty());
    assert_eq!(shown.load(Ordering::SeqCst), 2);
    pipeline.shutdown();
}

#[test]
fn ssd_layout_keeps_pre_suppressed_overlaps() {
    // two overlapping rows survive because the exporting graph already ran
    // suppression; the anchor-free path would have collapsed them
    let engine = StubEngine {
        outputs: VecDeque::from(vec![Ok(ssd(
            &[[0.1, 0.1, 0.6, 0.6], [0.1, 0.1, 0.6, 0.58]],
            &[2.0, 2.0],
            &[0.9, 0.8],
            2.0,
        ))]),
        layout: ModelLayout::Ssd(SsdOrder::Tf1),
    };
    let script = Script::new(true);
    let (mut pipeline, _shown) = build_pipeline(engine, StubCamera::with_frames(1), script.clone());

    match pipeline.run_once().unwrap() {
        FrameOutcome::Processed {
            detections,
            decision,
            actuated,
        } => {
            assert_eq!(detections, 2);
            assert_eq!(decision.unwrap().label, "stone");
            assert!(actuated);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    pipeline.shutdown();
}

#[test]
fn empty_camera_reports_end_of_stream() {
    let engine = StubEngine {
        outputs: VecDeque::new(),
        layout: ModelLayout::AnchorFree,
    };
    let script = Script::new(true);
    let (mut pipeline, shown) = build_pipeline(engine, StubCamera::with_frames(0), script.clone());

    match pipeline.run_once().unwrap() {
        FrameOutcome::EndOfStream => {}
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(shown.load(Ordering::SeqCst), 0);
    assert!(script.recorded_writes().is_empty());
    pipeline.shutdown();
}

#[test]
fn stop_flag_halts_the_loop_before_capture() {
    let engine = StubEngine {
        outputs: VecDeque::new(),
        layout: ModelLayout::AnchorFree,
    };
    let script = Script::new(true);
    let (mut pipeline, shown) = build_pipeline(engine, StubCamera::with_frames(3), script.clone());

    pipeline.stop_handle().store(true, Ordering::Relaxed);
    pipeline.run().unwrap();

    assert_eq!(shown.load(Ordering::SeqCst), 0);
    assert!(script.recorded_writes().is_empty());
    pipeline.shutdown();
}
