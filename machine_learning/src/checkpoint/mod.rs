//! Checkpoint files of the canonical parameters.
//!
//! Every checkpoint is a `safetensors` file named `model.<episodes>.safetensors` holding one
//! tensor per `ParamLayout` entry, the episode count is also kept in the file's metadata.

mod error;

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use safetensors::{Dtype, SafeTensors, tensor::TensorView};

pub use error::{CheckpointErr, Result};

use crate::arch::ParamLayout;

const PREFIX: &str = "model.";
const EXTENSION: &str = ".safetensors";
const EPISODES_KEY: &str = "episodes";

/// Returns the path of the checkpoint for `episodes` inside `dir`.
pub fn checkpoint_path(dir: &Path, episodes: u64) -> PathBuf {
    dir.join(format!("{PREFIX}{episodes}{EXTENSION}"))
}

/// Parses the episode count out of a checkpoint file name.
///
/// # Returns
/// `None` if the name doesn't follow the `model.<episodes>.safetensors` pattern.
pub fn parse_episodes(file_name: &str) -> Option<u64> {
    file_name
        .strip_prefix(PREFIX)?
        .strip_suffix(EXTENSION)?
        .parse()
        .ok()
}

/// Writes the parameters to a new checkpoint file.
///
/// # Arguments
/// * `dir` - The run directory.
/// * `episodes` - The global episode count the checkpoint is taken at.
/// * `layout` - The layout of `params`.
/// * `params` - The flat parameter vector.
///
/// # Returns
/// The path of the written file or an io/format error.
pub fn save(dir: &Path, episodes: u64, layout: &ParamLayout, params: &[f32]) -> Result<PathBuf> {
    let views = layout
        .split(params)
        .map_err(|_| CheckpointErr::TensorShape {
            name: "<all>".into(),
            got: vec![params.len()],
            expected: vec![layout.size()],
        })?;

    let tensors = layout
        .tensors()
        .iter()
        .zip(views)
        .map(|(spec, data)| {
            let view = TensorView::new(Dtype::F32, spec.shape().to_vec(), bytemuck::cast_slice(data))?;
            Ok((spec.name().to_string(), view))
        })
        .collect::<Result<Vec<_>>>()?;

    let metadata = HashMap::from([(EPISODES_KEY.to_string(), episodes.to_string())]);
    let path = checkpoint_path(dir, episodes);
    safetensors::serialize_to_file(tensors, &Some(metadata), &path)?;

    Ok(path)
}

/// Finds the checkpoint with the largest episode count inside `dir`.
///
/// # Returns
/// The episode count and path of the latest checkpoint, `None` if there's none.
pub fn latest(dir: &Path) -> Result<Option<(u64, PathBuf)>> {
    if !dir.exists() {
        return Ok(None);
    }

    let mut best: Option<(u64, PathBuf)> = None;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(episodes) = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(parse_episodes)
        else {
            continue;
        };

        if best.as_ref().is_none_or(|(n, _)| episodes > *n) {
            best = Some((episodes, path));
        }
    }

    Ok(best)
}

/// Reads a checkpoint file, validating it against `layout`.
///
/// # Returns
/// The flat parameter vector in layout order.
pub fn load(path: &Path, layout: &ParamLayout) -> Result<Vec<f32>> {
    let buf = fs::read(path)?;
    let file = SafeTensors::deserialize(&buf)?;
    let mut params = Vec::with_capacity(layout.size());

    for spec in layout.tensors() {
        let name = spec.name();
        let tensor = file
            .tensor(name)
            .map_err(|_| CheckpointErr::MissingTensor(name.to_string()))?;

        if tensor.dtype() != Dtype::F32 {
            return Err(CheckpointErr::Dtype(name.to_string()));
        }

        if tensor.shape() != spec.shape() {
            return Err(CheckpointErr::TensorShape {
                name: name.to_string(),
                got: tensor.shape().to_vec(),
                expected: spec.shape().to_vec(),
            });
        }

        // The buffer isn't guaranteed to be aligned for f32.
        params.extend(bytemuck::pod_collect_to_vec::<u8, f32>(tensor.data()));
    }

    Ok(params)
}

/// Loads the checkpoint with the largest episode count inside `dir`.
///
/// # Returns
/// The episode count and the parameters, `None` if the directory holds no checkpoint.
pub fn load_latest(dir: &Path, layout: &ParamLayout) -> Result<Option<(u64, Vec<f32>)>> {
    match latest(dir)? {
        Some((episodes, path)) => {
            let params = load(&path, layout)?;
            log::info!(episodes = episodes; "loaded checkpoint {}", path.display());
            Ok(Some((episodes, params)))
        }
        None => Ok(None),
    }
}
