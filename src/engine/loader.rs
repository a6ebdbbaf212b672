//! Model weights management and OpenVINO model loading

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use openvino::{CompiledModel, Core};
use tracing::{debug, info};

use crate::config::{InferenceConfig, ModelConfig};

/// Wrapper for OpenVINO CompiledModel that implements Send + Sync
#[derive(Clone)]
pub struct SafeCompiledModel(pub Arc<CompiledModel>);
unsafe impl Send for SafeCompiledModel {}
unsafe impl Sync for SafeCompiledModel {}

impl SafeCompiledModel {
    /// Create an inference request
    /// OpenVINO CompiledModel methods are thread-safe in C++, but Rust bindings
    /// require &mut self. We bypass this restriction safely.
    pub fn create_infer_request(&self) -> Result<openvino::InferRequest> {
        unsafe {
            let ptr = Arc::as_ptr(&self.0) as *mut CompiledModel;
            (*ptr).create_infer_request().map_err(|e| e.into())
        }
    }
}

impl Deref for SafeCompiledModel {
    type Target = CompiledModel;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Ensure the weights file exists locally, downloading it if missing.
///
/// A present file short-circuits; there is no freshness check, the weights
/// are a fixed artifact.
pub async fn ensure_weights(config: &ModelConfig) -> Result<PathBuf> {
    let path = config.weights_path.clone();

    if path.exists() {
        debug!("Weights already present at {:?}", path);
        return Ok(path);
    }

    info!("Weights missing at {:?}, downloading from {}", path, config.weights_url);

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .context("Failed to create weights directory")?;
    }

    let response = reqwest::get(&config.weights_url)
        .await
        .context("Weights download request failed")?;

    if !response.status().is_success() {
        anyhow::bail!("Weights download failed with status {}", response.status());
    }

    let bytes = response
        .bytes()
        .await
        .context("Failed to read weights download body")?;

    tokio::fs::write(&path, &bytes)
        .await
        .context("Failed to write weights file")?;

    info!("Downloaded {} bytes to {:?}", bytes.len(), path);

    Ok(path)
}

/// The loaded floor-plan detection model.
///
/// Compiled once at startup and shared for the lifetime of the process.
pub struct PlanModel {
    compiled: SafeCompiledModel,
    input_size: u32,
}

impl PlanModel {
    /// Read and compile the model for the configured device.
    pub fn load(config: &InferenceConfig, weights_path: &Path) -> Result<Self> {
        info!("Loading model from {:?}", weights_path);
        let start = Instant::now();

        let mut core = Core::new()?;
        let path = weights_path
            .to_str()
            .context("Weights path is not valid UTF-8")?;
        let model = core.read_model_from_file(path, "")?;
        let compiled = core.compile_model(&model, config.device.as_str().into())?;

        info!("Model compiled for {} in {:?}", config.device, start.elapsed());

        Ok(Self {
            compiled: SafeCompiledModel(Arc::new(compiled)),
            input_size: config.input_size,
        })
    }

    pub fn compiled(&self) -> &SafeCompiledModel {
        &self.compiled
    }

    pub fn input_size(&self) -> u32 {
        self.input_size
    }
}
