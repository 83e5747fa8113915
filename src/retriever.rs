// Asset retrieval: list the produced images of a finished task and write
// each one into the shared output directory.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::api::TaskApi;
use crate::error::Result;
use crate::model::{AssetReference, TaskHandle};
use crate::report::Progress;

const IMAGE_EXTENSION: &str = "png";

pub struct AssetRetriever {
    out_dir: PathBuf,
}

impl AssetRetriever {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Create the output directory if it does not exist yet.
    pub fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;
        Ok(())
    }

    /// `{prefix}_{handle}_{n}.png` inside the output directory, `n` being the
    /// asset's 1-based position in the task's image list.
    pub fn file_path(&self, prefix: &str, handle: &TaskHandle, n: usize) -> PathBuf {
        self.out_dir
            .join(format!("{prefix}_{handle}_{n}.{IMAGE_EXTENSION}"))
    }

    /// Download every asset of a completed task. Individual download or
    /// write failures are reported and skipped; only a failed result lookup
    /// fails the whole call.
    pub fn retrieve<C: TaskApi>(
        &self,
        client: &C,
        handle: &TaskHandle,
        prefix: &str,
        progress: &mut dyn Progress,
    ) -> Result<Vec<PathBuf>> {
        let assets = client.result(handle)?;
        debug!("task {handle} produced {} asset(s)", assets.len());
        self.prepare()?;

        let mut saved = Vec::with_capacity(assets.len());
        for asset in &assets {
            let n = asset.position;
            let path = self.file_path(prefix, handle, n);
            match self.save_one(client, asset, &path) {
                Ok(()) => {
                    progress.asset_saved(&path);
                    saved.push(path);
                }
                Err(e) => progress.asset_skipped(n, &e),
            }
        }
        Ok(saved)
    }

    fn save_one<C: TaskApi>(
        &self,
        client: &C,
        asset: &AssetReference,
        path: &Path,
    ) -> Result<()> {
        let bytes = client.fetch_asset(asset)?;
        fs::write(path, bytes)?;
        Ok(())
    }
}
