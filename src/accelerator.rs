//! Accelerator backend discovery.
//!
//! Inference runs through ONNX Runtime loaded at runtime from a shared
//! library. Boards with an NPU or GPU ship vendor runtime builds at known
//! paths; the resolver walks the configured candidate list in priority order
//! and commits the first library that loads. Everything here is best-effort:
//! a board without any accelerator still runs, just on CPU.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Acceleration backend tag carried by a candidate runtime library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceleratorBackend {
    /// VeriSilicon NPU/VPU runtime (i.MX 8M Plus class boards).
    VsiNpu,
    /// Arm Ethos-U microNPU runtime.
    EthosU,
    /// NXP neural runtime.
    ImxNpu,
    /// Generic GPU path (Arm Compute Library / OpenCL).
    Gpu,
    #[default]
    Cpu,
}

impl AcceleratorBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcceleratorBackend::VsiNpu => "vsi-npu",
            AcceleratorBackend::EthosU => "ethos-u",
            AcceleratorBackend::ImxNpu => "imx-npu",
            AcceleratorBackend::Gpu => "gpu",
            AcceleratorBackend::Cpu => "cpu",
        }
    }

    pub fn is_accelerated(&self) -> bool {
        !matches!(self, AcceleratorBackend::Cpu)
    }
}

/// One entry of the resolution order: a runtime library path plus the backend
/// it provides. The list itself is configuration, not code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceleratorCandidate {
    pub library: PathBuf,
    pub backend: AcceleratorBackend,
}

/// Result of resolution. Created once at startup, immutable thereafter.
#[derive(Debug, Clone, Default)]
pub struct AcceleratorChoice {
    pub backend: AcceleratorBackend,
    pub library: Option<PathBuf>,
}

static RESOLVED: OnceLock<AcceleratorChoice> = OnceLock::new();

/// Resolves the acceleration backend for this process.
///
/// Runs the probe exactly once per process lifetime; later calls return the
/// memoized choice. Failure to load any candidate is not an error, it only
/// degrades the accelerated path.
pub fn resolve(
    candidates: &[AcceleratorCandidate],
    cpu_runtime: Option<&Path>,
) -> AcceleratorChoice {
    RESOLVED
        .get_or_init(|| probe(candidates, cpu_runtime))
        .clone()
}

fn probe(candidates: &[AcceleratorCandidate], cpu_runtime: Option<&Path>) -> AcceleratorChoice {
    for candidate in candidates {
        if !candidate.library.exists() {
            log::debug!(
                "{} runtime not present at {:?}",
                candidate.backend.as_str(),
                candidate.library
            );
            continue;
        }
        match ort::init_from(candidate.library.to_string_lossy()).commit() {
            Ok(_) => {
                log::info!(
                    "using {} acceleration ({:?})",
                    candidate.backend.as_str(),
                    candidate.library
                );
                return AcceleratorChoice {
                    backend: candidate.backend,
                    library: Some(candidate.library.clone()),
                };
            }
            Err(err) => {
                log::warn!(
                    "{} runtime at {:?} failed to load: {err}",
                    candidate.backend.as_str(),
                    candidate.library
                );
            }
        }
    }

    let committed = match cpu_runtime {
        Some(path) => ort::init_from(path.to_string_lossy()).commit(),
        None => ort::init().commit(),
    };
    if let Err(err) = committed {
        // Session creation will surface this again as a model load error.
        log::warn!("default runtime initialization failed: {err}");
    }
    log::info!("no accelerator available, running inference on CPU");
    AcceleratorChoice::default()
}
