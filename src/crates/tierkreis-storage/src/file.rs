//! An on-disk [`ControllerStorage`] backend.
//!
//! Every fact is a small file under a per-location directory, so a crashed
//! controller process can be resumed by pointing a fresh one at the same
//! `base_dir`:
//!
//! ```text
//! <base_dir>/
//!   metadata/<root>.bin          bincode-encoded GraphData
//!   locations/<loc>/_started
//!   locations/<loc>/_finished
//!   locations/<loc>/_error        human-readable message, if any
//!   locations/<loc>/definition    bincode-encoded NodeDescription
//!   locations/<loc>/call_args     bincode-encoded WorkerCallArgs
//!   locations/<loc>/outputs/<port>
//!   _debug/<name>                 the Loc string it names
//!   _links/<to>/<port>            "<src-loc>\t<src-port>" it resolves to
//!   _loop_latest/<loop_loc>       the highest iteration index, as text
//!   _errors                       append-only "<loc>\t<message>\n" log
//! ```
//!
//! The presence of a file is the fact: `_started`/`_finished`/`_error`
//! existing is what [`is_node_started`](ControllerStorage::is_node_started) etc. check, so marking a
//! location twice is naturally idempotent (the second write just recreates
//! an already-existing empty file).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use tierkreis_core::{GraphData, Loc, NodeDescription, PortID};

use crate::call_args::WorkerCallArgs;
use crate::error::StorageError;
use crate::traits::ControllerStorage;

/// A [`ControllerStorage`] backend persisting every fact under a directory
/// on disk.
pub struct FileStorage {
    base_dir: PathBuf,
}

impl FileStorage {
    /// Open (creating if necessary) a file-backed store rooted at
    /// `base_dir`.
    pub async fn open(base_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).await?;
        Ok(FileStorage { base_dir })
    }

    fn loc_dir(&self, loc: &Loc) -> PathBuf {
        self.base_dir.join("locations").join(loc.to_string())
    }

    fn outputs_dir(&self, loc: &Loc) -> PathBuf {
        self.loc_dir(loc).join("outputs")
    }

    fn metadata_path(&self, root: &Loc) -> PathBuf {
        self.base_dir.join("metadata").join(format!("{root}.bin"))
    }

    fn debug_path(&self, name: &str) -> PathBuf {
        self.base_dir.join("_debug").join(name)
    }

    fn link_path(&self, loc: &Loc, port: &PortID) -> PathBuf {
        self.base_dir
            .join("_links")
            .join(loc.to_string())
            .join(port)
    }

    fn links_dir(&self, loc: &Loc) -> PathBuf {
        self.base_dir.join("_links").join(loc.to_string())
    }

    fn loop_latest_path(&self, loop_loc: &Loc) -> PathBuf {
        self.base_dir
            .join("_loop_latest")
            .join(loop_loc.to_string())
    }

    fn errors_log_path(&self) -> PathBuf {
        self.base_dir.join("_errors")
    }

    async fn ensure_parent(path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Follow `_links` transitively to the final `(loc, port)` target.
    async fn resolve(&self, loc: &Loc, port: &PortID) -> Result<(Loc, PortID), StorageError> {
        let mut current_loc = loc.clone();
        let mut current_port = port.clone();
        let mut hops = 0;
        loop {
            let link_path = self.link_path(&current_loc, &current_port);
            match fs::read_to_string(&link_path).await {
                Ok(content) => {
                    let (loc_str, port_str) = content.trim().split_once('\t').ok_or_else(|| {
                        StorageError::Backend(format!(
                            "corrupt link record for {current_loc}/{current_port}"
                        ))
                    })?;
                    current_loc = loc_str.parse()?;
                    current_port = port_str.to_string();
                    hops += 1;
                    if hops > 1_000 {
                        // A link cycle would otherwise spin forever; this can only
                        // happen from a corrupted store, never from normal use.
                        return Ok((current_loc, current_port));
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Ok((current_loc, current_port))
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl ControllerStorage for FileStorage {
    async fn write_metadata(&self, root: &Loc, graph: &GraphData) -> Result<(), StorageError> {
        let path = self.metadata_path(root);
        Self::ensure_parent(&path).await?;
        fs::write(&path, bincode::serialize(graph)?).await?;
        Ok(())
    }

    async fn read_metadata(&self, root: &Loc) -> Result<GraphData, StorageError> {
        let bytes = fs::read(self.metadata_path(root)).await?;
        Ok(bincode::deserialize(&bytes)?)
    }

    async fn write_node_description(
        &self,
        loc: &Loc,
        description: &NodeDescription,
    ) -> Result<(), StorageError> {
        let path = self.loc_dir(loc).join("definition");
        Self::ensure_parent(&path).await?;
        fs::write(&path, bincode::serialize(description)?).await?;
        Ok(())
    }

    async fn read_node_description(&self, loc: &Loc) -> Result<NodeDescription, StorageError> {
        let path = self.loc_dir(loc).join("definition");
        let bytes = fs::read(&path)
            .await
            .map_err(|_| StorageError::MissingDescription(loc.clone()))?;
        Ok(bincode::deserialize(&bytes)?)
    }

    async fn write_output(&self, loc: &Loc, port: &PortID, value: &[u8]) -> Result<(), StorageError> {
        let path = self.outputs_dir(loc).join(port);
        if fs::metadata(&path).await.is_ok() {
            return Ok(());
        }
        Self::ensure_parent(&path).await?;
        fs::write(&path, value).await?;
        Ok(())
    }

    async fn read_output(&self, loc: &Loc, port: &PortID) -> Result<Vec<u8>, StorageError> {
        let (resolved_loc, resolved_port) = self.resolve(loc, port).await?;
        let path = self.outputs_dir(&resolved_loc).join(&resolved_port);
        fs::read(&path).await.map_err(|_| StorageError::NotFound {
            loc: loc.clone(),
            port: port.clone(),
        })
    }

    async fn read_output_ports(&self, loc: &Loc) -> Result<Vec<PortID>, StorageError> {
        let mut ports = std::collections::HashSet::new();

        let dir = self.outputs_dir(loc);
        match fs::read_dir(&dir).await {
            Ok(mut entries) => {
                while let Some(entry) = entries.next_entry().await? {
                    if let Some(name) = entry.file_name().to_str() {
                        ports.insert(name.to_string());
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let links_dir = self.links_dir(loc);
        match fs::read_dir(&links_dir).await {
            Ok(mut entries) => {
                while let Some(entry) = entries.next_entry().await? {
                    if let Some(name) = entry.file_name().to_str() {
                        ports.insert(name.to_string());
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        Ok(ports.into_iter().collect())
    }

    async fn link_outputs(
        &self,
        dst_loc: &Loc,
        dst_port: &PortID,
        src_loc: &Loc,
        src_port: &PortID,
    ) -> Result<(), StorageError> {
        let (resolved_loc, resolved_port) = self.resolve(src_loc, src_port).await?;
        let path = self.link_path(dst_loc, dst_port);
        Self::ensure_parent(&path).await?;
        fs::write(&path, format!("{resolved_loc}\t{resolved_port}")).await?;
        Ok(())
    }

    async fn mark_node_started(&self, loc: &Loc) -> Result<(), StorageError> {
        let path = self.loc_dir(loc).join("_started");
        Self::ensure_parent(&path).await?;
        fs::write(&path, []).await?;
        debug!(%loc, "marked started");
        Ok(())
    }

    async fn is_node_started(&self, loc: &Loc) -> Result<bool, StorageError> {
        Ok(fs::metadata(self.loc_dir(loc).join("_started")).await.is_ok())
    }

    async fn mark_node_finished(&self, loc: &Loc) -> Result<(), StorageError> {
        let path = self.loc_dir(loc).join("_finished");
        Self::ensure_parent(&path).await?;
        fs::write(&path, []).await?;
        debug!(%loc, "marked finished");
        Ok(())
    }

    async fn is_node_finished(&self, loc: &Loc) -> Result<bool, StorageError> {
        Ok(fs::metadata(self.loc_dir(loc).join("_finished")).await.is_ok())
    }

    async fn write_node_error(&self, loc: &Loc, message: &str) -> Result<(), StorageError> {
        let path = self.loc_dir(loc).join("_error");
        if fs::metadata(&path).await.is_ok() {
            return Ok(());
        }
        Self::ensure_parent(&path).await?;
        fs::write(&path, message).await?;
        let log_path = self.errors_log_path();
        Self::ensure_parent(&log_path).await?;
        let mut existing = fs::read_to_string(&log_path).await.unwrap_or_default();
        existing.push_str(&format!("{loc}\t{message}\n"));
        fs::write(&log_path, existing).await?;
        Ok(())
    }

    async fn node_has_error(&self, loc: &Loc) -> Result<bool, StorageError> {
        Ok(fs::metadata(self.loc_dir(loc).join("_error")).await.is_ok())
    }

    async fn read_errors(&self, loc: &Loc) -> Result<Vec<(Loc, String)>, StorageError> {
        let text = match fs::read_to_string(self.errors_log_path()).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut errors = Vec::new();
        for line in text.lines() {
            if let Some((loc_str, message)) = line.split_once('\t') {
                let err_loc: Loc = loc_str.parse()?;
                if loc.is_prefix_of(&err_loc) {
                    errors.push((err_loc, message.to_string()));
                }
            }
        }
        Ok(errors)
    }

    async fn write_worker_call_args(
        &self,
        loc: &Loc,
        args: &WorkerCallArgs,
    ) -> Result<(), StorageError> {
        let path = self.loc_dir(loc).join("call_args");
        Self::ensure_parent(&path).await?;
        fs::write(&path, bincode::serialize(args)?).await?;
        Ok(())
    }

    async fn read_worker_call_args(&self, loc: &Loc) -> Result<WorkerCallArgs, StorageError> {
        let path = self.loc_dir(loc).join("call_args");
        let bytes = fs::read(&path)
            .await
            .map_err(|_| StorageError::MissingDescription(loc.clone()))?;
        Ok(bincode::deserialize(&bytes)?)
    }

    async fn latest_loop_iteration(&self, loop_loc: &Loc) -> Result<Option<usize>, StorageError> {
        match fs::read_to_string(self.loop_latest_path(loop_loc)).await {
            Ok(text) => Ok(Some(text.trim().parse().map_err(|_| {
                StorageError::Backend(format!("corrupt loop-latest record for {loop_loc}"))
            })?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_debug_data(&self, name: &str, loc: &Loc) -> Result<(), StorageError> {
        let path = self.debug_path(name);
        Self::ensure_parent(&path).await?;
        fs::write(&path, loc.to_string()).await?;

        if let Ok((tierkreis_core::Step::Loop(iter), parent)) = loc.pop_last() {
            let path = self.loop_latest_path(&parent);
            let current = self.latest_loop_iteration(&parent).await?.unwrap_or(0);
            Self::ensure_parent(&path).await?;
            fs::write(&path, current.max(iter).to_string()).await?;
        }
        Ok(())
    }

    async fn loc_from_node_name(&self, name: &str) -> Result<Loc, StorageError> {
        let text = fs::read_to_string(self.debug_path(name))
            .await
            .map_err(|_| StorageError::MissingDebugName(name.to_string()))?;
        Ok(text.parse()?)
    }
}
