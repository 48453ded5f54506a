// Execution device selection for the model classifier.
//
// Probed once at the start of a run. A failed or negative probe never aborts
// anything: the classifier simply runs on the CPU provider.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use ort::execution_providers::{
    CUDAExecutionProvider, ExecutionProvider, ExecutionProviderDispatch,
};
use tracing::{info, warn};

/// Which device the user asked for (REVIEWLENS_DEVICE).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevicePreference {
    /// Use CUDA when the runtime reports it, otherwise CPU
    Auto,
    Cpu,
    Cuda,
}

impl FromStr for DevicePreference {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" | "" => Ok(DevicePreference::Auto),
            "cpu" => Ok(DevicePreference::Cpu),
            "cuda" | "gpu" => Ok(DevicePreference::Cuda),
            other => anyhow::bail!("Unknown device {other:?} (expected auto, cpu, or cuda)"),
        }
    }
}

/// The device the classifier will actually run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda,
}

impl Device {
    /// Resolve a preference to a concrete device.
    pub fn probe(preference: DevicePreference) -> Self {
        if preference == DevicePreference::Cpu {
            return Device::Cpu;
        }

        match CUDAExecutionProvider::default().is_available() {
            Ok(true) => {
                info!("CUDA execution provider available");
                Device::Cuda
            }
            Ok(false) => {
                if preference == DevicePreference::Cuda {
                    warn!("CUDA requested but not available, using CPU");
                }
                Device::Cpu
            }
            Err(e) => {
                warn!(error = %e, "Accelerator probe failed, using CPU");
                Device::Cpu
            }
        }
    }

    /// Execution providers to register on the session, in priority order.
    /// Empty means the runtime's default CPU provider.
    pub fn execution_providers(self) -> Vec<ExecutionProviderDispatch> {
        match self {
            Device::Cpu => Vec::new(),
            Device::Cuda => vec![CUDAExecutionProvider::default().build()],
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda => write!(f, "cuda"),
        }
    }
}
