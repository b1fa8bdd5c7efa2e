// Copyright 2024 The poem-generator Authors
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Checkpoint inspection
//!
//! Reads tensor shapes out of a weight file without materializing the weights.
//! Only the `safetensors` layout carries a self-describing header that can be read this way.
//! The file is memory-mapped and only its header is parsed and validated.
//! The `.ot` archives produced by `tch` must be fully deserialized to be inspected, in which
//! case shape mismatches surface when the variable store is loaded instead.

use crate::common::error::PoemGeneratorError;
use memmap2::MmapOptions;
use safetensors::tensor::Metadata;
use safetensors::SafeTensors;
use std::fs::File;
use std::path::Path;

/// Names under which the shared token embedding of an MBart checkpoint may be stored.
pub const EMBEDDING_TENSOR_NAMES: [&str; 3] = [
    "model.shared.weight",
    "shared.weight",
    "model.encoder.embed_tokens.weight",
];

/// Reads and validates the header of a `safetensors` file.
pub fn read_safetensors_metadata<P: AsRef<Path>>(
    path: P,
) -> Result<Metadata, PoemGeneratorError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        PoemGeneratorError::LoadFailure(format!(
            "could not open checkpoint {}: {}",
            path.display(),
            e
        ))
    })?;
    let buffer = unsafe { MmapOptions::new().map(&file)? };
    let (_, metadata) = SafeTensors::read_metadata(&buffer).map_err(|e| {
        PoemGeneratorError::LoadFailure(format!(
            "invalid safetensors checkpoint {}: {}",
            path.display(),
            e
        ))
    })?;
    Ok(metadata)
}

/// Returns the number of rows of the shared token embedding stored in a checkpoint.
///
/// `Ok(None)` is returned for formats that cannot be inspected without loading the weights.
pub fn embedding_rows<P: AsRef<Path>>(path: P) -> Result<Option<i64>, PoemGeneratorError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(PoemGeneratorError::LoadFailure(format!(
            "checkpoint not found at {}",
            path.display()
        )));
    }
    let is_safetensors = path
        .extension()
        .map_or(false, |extension| extension == "safetensors");
    if !is_safetensors {
        return Ok(None);
    }

    let metadata = read_safetensors_metadata(path)?;
    let tensors = metadata.tensors();
    EMBEDDING_TENSOR_NAMES
        .iter()
        .find_map(|name| tensors.get(*name))
        .map(|info| match info.shape.as_slice() {
            [rows, _] => Ok(Some(*rows as i64)),
            shape => Err(PoemGeneratorError::LoadFailure(format!(
                "embedding table in {} should be 2-dimensional, got shape {:?}",
                path.display(),
                shape
            ))),
        })
        .unwrap_or_else(|| {
            Err(PoemGeneratorError::LoadFailure(format!(
                "no token embedding ({}) found in {}",
                EMBEDDING_TENSOR_NAMES.join(", "),
                path.display()
            )))
        })
}

#[cfg(test)]
mod test {
    use super::*;
    use safetensors::tensor::TensorView;
    use safetensors::Dtype;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_safetensors(
        dir: &Path,
        name: &str,
        tensors: &[(&str, Vec<usize>)],
    ) -> anyhow::Result<PathBuf> {
        let data: Vec<Vec<u8>> = tensors
            .iter()
            .map(|(_, shape)| vec![0u8; shape.iter().product::<usize>() * 4])
            .collect();
        let mut views = Vec::with_capacity(tensors.len());
        for ((tensor_name, shape), bytes) in tensors.iter().zip(data.iter()) {
            views.push((*tensor_name, TensorView::new(Dtype::F32, shape.clone(), bytes)?));
        }
        let path = dir.join(name);
        std::fs::write(&path, safetensors::serialize(views, &None)?)?;
        Ok(path)
    }

    #[test]
    fn reads_embedding_rows_from_header() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_safetensors(
            dir.path(),
            "model.safetensors",
            &[
                ("model.shared.weight", vec![27, 8]),
                ("lm_head.weight", vec![27, 8]),
            ],
        )?;
        assert_eq!(embedding_rows(&path)?, Some(27));
        Ok(())
    }

    #[test]
    fn falls_back_to_encoder_embedding() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_safetensors(
            dir.path(),
            "model.safetensors",
            &[("model.encoder.embed_tokens.weight", vec![64, 8])],
        )?;
        assert_eq!(embedding_rows(&path)?, Some(64));
        Ok(())
    }

    #[test]
    fn missing_embedding_is_a_load_failure() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_safetensors(
            dir.path(),
            "model.safetensors",
            &[("lm_head.weight", vec![64, 8])],
        )?;
        assert!(matches!(
            embedding_rows(&path),
            Err(PoemGeneratorError::LoadFailure(_))
        ));
        Ok(())
    }

    #[test]
    fn flat_embedding_is_a_load_failure() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_safetensors(
            dir.path(),
            "model.safetensors",
            &[("model.shared.weight", vec![512])],
        )?;
        assert!(matches!(
            embedding_rows(&path),
            Err(PoemGeneratorError::LoadFailure(_))
        ));
        Ok(())
    }

    #[test]
    fn truncated_checkpoint_is_a_load_failure() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_safetensors(
            dir.path(),
            "model.safetensors",
            &[("model.shared.weight", vec![16, 8])],
        )?;
        let bytes = std::fs::read(&path)?;
        std::fs::write(&path, &bytes[..bytes.len() - 4])?;
        assert!(matches!(
            embedding_rows(&path),
            Err(PoemGeneratorError::LoadFailure(_))
        ));
        Ok(())
    }

    #[test]
    fn header_without_data_is_a_load_failure() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("model.safetensors");
        let header = r#"{"model.shared.weight":{"dtype":"F32","shape":[250027,1024],"data_offsets":[0,0]}}"#;
        let mut bytes = (header.len() as u64).to_le_bytes().to_vec();
        bytes.extend_from_slice(header.as_bytes());
        std::fs::write(&path, bytes)?;
        assert!(matches!(
            embedding_rows(&path),
            Err(PoemGeneratorError::LoadFailure(_))
        ));
        Ok(())
    }

    #[test]
    fn torch_archives_are_not_inspected() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("rust_model.ot");
        File::create(&path)?.write_all(b"not a header")?;
        assert_eq!(embedding_rows(&path)?, None);
        Ok(())
    }

    #[test]
    fn missing_checkpoint_is_a_load_failure() {
        let result = embedding_rows("does/not/exist/rust_model.ot");
        assert!(matches!(result, Err(PoemGeneratorError::LoadFailure(_))));
    }
}
