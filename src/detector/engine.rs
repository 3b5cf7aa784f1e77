//! ONNX Runtime session wrapper.

use std::time::Instant;

use anyhow::{bail, Result};
use half::f16;
use ndarray::ArrayD;
use ort::execution_providers::{
    ACLExecutionProvider, ArmNNExecutionProvider, CPUExecutionProvider, ExecutionProvider,
    NNAPIExecutionProvider,
};
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::tensor::TensorElementType;
use ort::value::{DynValue, Value, ValueType};
use regex::Regex;

use crate::accelerator::{AcceleratorBackend, AcceleratorChoice};
use crate::data::{Frame, ModelConfig, StageTimes};
use crate::detector::{preprocess, Inference, InputTensor, ModelLayout, RawOutputs};
use crate::error::DetectorError;

pub const STAGE_PREPROCESS: usize = 0;
pub const STAGE_INFER: usize = 1;
pub const STAGE_EXTRACT: usize = 2;

/// Owns the compiled model and its session.
///
/// `infer` is synchronous and fully owns the session's tensor buffers for its
/// duration; the engine is deliberately not `Clone` and takes `&mut self`.
pub struct Engine {
    session: Session,
    backend: AcceleratorBackend,
    input_name: String,
    output_names: Vec<String>,
    output_types: Vec<TensorElementType>,
    input_width: u32,
    input_height: u32,
    quantized_input: bool,
    layout: ModelLayout,
    pub stats: StageTimes,
}

impl Engine {
    /// Loads the model under the resolved accelerator choice.
    ///
    /// If the accelerated execution provider turns out to be unavailable or
    /// rejects registration, the engine degrades to CPU and keeps going; only
    /// an unusable model is fatal.
    pub fn load(config: &ModelConfig, choice: &AcceleratorChoice) -> Result<Self, DetectorError> {
        let mut builder = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .map_err(|err| DetectorError::ModelLoad(err.to_string()))?;

        let mut backend = choice.backend;
        match backend {
            AcceleratorBackend::VsiNpu | AcceleratorBackend::ImxNpu => {
                if let Err(err) = Self::register_npu(&mut builder) {
                    log::warn!("{err}, using CPU");
                    backend = AcceleratorBackend::Cpu;
                }
            }
            AcceleratorBackend::EthosU => {
                if let Err(err) = Self::register_ethos(&mut builder) {
                    log::warn!("{err}, using CPU");
                    backend = AcceleratorBackend::Cpu;
                }
            }
            AcceleratorBackend::Gpu => {
                if let Err(err) = Self::register_gpu(&mut builder) {
                    log::warn!("{err}, using CPU");
                    backend = AcceleratorBackend::Cpu;
                }
            }
            AcceleratorBackend::Cpu => {}
        }
        // CPU provider is always registered last as the executor of record
        // for anything the accelerated provider does not claim.
        Self::register_cpu(&mut builder).map_err(|err| DetectorError::ModelLoad(err.to_string()))?;

        let session = builder
            .commit_from_file(&config.model_path)
            .map_err(|err| {
                DetectorError::ModelLoad(format!("{}: {err}", config.model_path))
            })?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| DetectorError::ModelLoad("model declares no inputs".to_string()))?;
        let input_name = input.name.clone();
        let (dtype, dims) = match &input.input_type {
            ValueType::Tensor { ty, dimensions, .. } => (*ty, dimensions.clone()),
            other => {
                return Err(DetectorError::ModelLoad(format!(
                    "unsupported input value type {other:?}"
                )))
            }
        };
        if dims.len() != 4 || dims[3] != 3 {
            return Err(DetectorError::ModelLoad(format!(
                "expected [1, H, W, 3] input, model declares {dims:?}"
            )));
        }
        let input_height = dims[1];
        let input_width = dims[2];
        if input_height <= 0 || input_width <= 0 {
            return Err(DetectorError::ModelLoad(
                "dynamic input dimensions are not supported".to_string(),
            ));
        }

        let quantized_input = match dtype {
            TensorElementType::Uint8 => true,
            TensorElementType::Float32 => false,
            other => {
                return Err(DetectorError::ModelLoad(format!(
                    "unsupported input dtype {other:?}"
                )))
            }
        };

        let output_names: Vec<String> =
            session.outputs.iter().map(|o| o.name.clone()).collect();
        let output_types: Vec<TensorElementType> = session
            .outputs
            .iter()
            .map(|o| match &o.output_type {
                ValueType::Tensor { ty, .. } => *ty,
                _ => TensorElementType::Float32,
            })
            .collect();
        let layout = ModelLayout::detect(&output_names)?;

        log::info!(
            "model loaded: {} | input {}x{} {} | {:?} layout | backend {}",
            config.model_path,
            input_width,
            input_height,
            if quantized_input { "u8" } else { "f32" },
            layout,
            backend.as_str(),
        );

        Ok(Self {
            session,
            backend,
            input_name,
            output_names,
            output_types,
            input_width: input_width as u32,
            input_height: input_height as u32,
            quantized_input,
            layout,
            stats: StageTimes::default(),
        })
    }

    fn register_npu(builder: &mut SessionBuilder) -> Result<()> {
        let ep = NNAPIExecutionProvider::default();
        if !ep.is_available()? {
            bail!("NNAPI execution provider not available");
        }
        if let Err(err) = ep.register(builder) {
            bail!("NNAPI registration failed: {err}");
        }
        Ok(())
    }

    fn register_ethos(builder: &mut SessionBuilder) -> Result<()> {
        let ep = ArmNNExecutionProvider::default();
        if !ep.is_available()? {
            bail!("Arm NN execution provider not available");
        }
        if let Err(err) = ep.register(builder) {
            bail!("Arm NN registration failed: {err}");
        }
        Ok(())
    }

    fn register_gpu(builder: &mut SessionBuilder) -> Result<()> {
        let ep = ACLExecutionProvider::default();
        if !ep.is_available()? {
            bail!("ACL execution provider not available");
        }
        if let Err(err) = ep.register(builder) {
            bail!("ACL registration failed: {err}");
        }
        Ok(())
    }

    fn register_cpu(builder: &mut SessionBuilder) -> Result<()> {
        let ep = CPUExecutionProvider::default();
        if let Err(err) = ep.register(builder) {
            bail!("CPU registration failed: {err}");
        }
        Ok(())
    }

    pub fn input_width(&self) -> u32 {
        self.input_width
    }

    pub fn input_height(&self) -> u32 {
        self.input_height
    }

    pub fn is_quantized(&self) -> bool {
        self.quantized_input
    }

    pub fn backend(&self) -> AcceleratorBackend {
        self.backend
    }

    /// Class names embedded in the model metadata, when present.
    ///
    /// Format: `{0: 'ok', 1: 'reject', ...}`.
    pub fn fetch_names(&self) -> Option<Vec<String>> {
        let names = match self.session.metadata() {
            Err(_) => None,
            Ok(metadata) => metadata.custom("names").unwrap_or_default(),
        }?;
        let re = Regex::new(r#"(['"])([-()\w '"]+)(['"])"#).ok()?;
        let mut parsed = Vec::new();
        for (_, [_, name, _]) in re.captures_iter(&names).map(|c| c.extract()) {
            parsed.push(name.to_string());
        }
        Some(parsed)
    }

    fn extract(value: &DynValue, dtype: &TensorElementType) -> Result<ArrayD<f32>, DetectorError> {
        fn pull<T>(value: &DynValue, map: impl Fn(T) -> f32) -> Result<ArrayD<f32>, DetectorError>
        where
            T: ort::tensor::PrimitiveTensorElementType + Clone + 'static,
        {
            value
                .try_extract_tensor::<T>()
                .map(|view| view.mapv(map))
                .map_err(|err| DetectorError::Inference(err.to_string()))
        }

        match dtype {
            TensorElementType::Float32 => pull::<f32>(value, |x| x),
            TensorElementType::Float16 => pull::<f16>(value, f16::to_f32),
            TensorElementType::Float64 => pull::<f64>(value, |x| x as f32),
            TensorElementType::Int64 => pull::<i64>(value, |x| x as f32),
            TensorElementType::Int32 => pull::<i32>(value, |x| x as f32),
            TensorElementType::Uint8 => pull::<u8>(value, |x| x as f32),
            TensorElementType::Int8 => pull::<i8>(value, |x| x as f32),
            other => Err(DetectorError::Inference(format!(
                "unsupported output dtype {other:?}"
            ))),
        }
    }
}

impl Inference for Engine {
    fn infer(&mut self, frame: &Frame) -> Result<RawOutputs, DetectorError> {
        let t_pre = Instant::now();
        let input = preprocess(frame, self.input_width, self.input_height, self.quantized_input)?;
        let value = match input {
            InputTensor::Quantized(arr) => Value::from_array(arr)
                .map_err(|err| DetectorError::Inference(err.to_string()))?
                .into_dyn(),
            InputTensor::Float(arr) => Value::from_array(arr)
                .map_err(|err| DetectorError::Inference(err.to_string()))?
                .into_dyn(),
        };
        self.stats.record(STAGE_PREPROCESS, t_pre.elapsed());

        let t_run = Instant::now();
        let inputs = ort::inputs![self.input_name.as_str() => value]
            .map_err(|err| DetectorError::Inference(err.to_string()))?;
        let outputs = self
            .session
            .run(inputs)
            .map_err(|err| DetectorError::Inference(err.to_string()))?;
        self.stats.record(STAGE_INFER, t_run.elapsed());

        let t_extract = Instant::now();
        let mut raw = RawOutputs::new();
        for (name, dtype) in self.output_names.iter().zip(self.output_types.iter()) {
            let tensor = Self::extract(&outputs[name.as_str()], dtype)?;
            raw.push(name, tensor);
        }
        self.stats.record(STAGE_EXTRACT, t_extract.elapsed());
        self.stats.frame_done();

        Ok(raw)
    }

    fn layout(&self) -> ModelLayout {
        self.layout
    }

    fn stats(&self) -> Option<&StageTimes> {
        Some(&self.stats)
    }
}
