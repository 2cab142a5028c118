//! Finds autoclave exports in folders and on removable media and feeds
//! them to the importer.

mod folder;
mod removable;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, info_span, warn};

pub use folder::FileOutcome;
pub use removable::{parse_lsblk, LsblkEnumerator, RemovableVolume, VolumeEnumerator};

use crate::db::autoclave_repo;
use crate::error::DiscoveryError;
use crate::import::ImportOrchestrator;
use crate::sanitize;

/// Reports imported from one removable volume bound to an autoclave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeScanResult {
    /// Autoclave name.
    pub autoclave: String,
    pub serial: String,
    pub path: PathBuf,
    pub files: Vec<FileOutcome>,
}

#[derive(Clone)]
pub struct SourceDiscovery {
    importer: ImportOrchestrator,
    volumes: Arc<dyn VolumeEnumerator>,
    removable_enabled: bool,
}

impl SourceDiscovery {
    pub fn new(
        importer: ImportOrchestrator,
        volumes: Arc<dyn VolumeEnumerator>,
        removable_enabled: bool,
    ) -> Self {
        Self {
            importer,
            volumes,
            removable_enabled,
        }
    }

    /// Imports every report file directly inside `folder`.
    pub fn scan_folder(&self, folder: &Path) -> Result<Vec<FileOutcome>, DiscoveryError> {
        let _span = info_span!("scan_folder", folder = %sanitize::redact_path(folder)).entered();
        folder::scan(&self.importer, folder)
    }

    /// Imports reports from every mounted removable volume whose identifier
    /// is bound to an active autoclave.
    ///
    /// Returns an empty list when removable scanning is disabled or the
    /// volumes cannot be enumerated.
    pub fn scan_removable_media(&self) -> Vec<VolumeScanResult> {
        if !self.removable_enabled {
            debug!("Removable media scanning disabled");
            return Vec::new();
        }
        let _span = info_span!("scan_removable_media").entered();

        let volumes = match self.volumes.volumes() {
            Ok(volumes) => volumes,
            Err(e) => {
                warn!(error = %e, "Could not enumerate removable volumes");
                return Vec::new();
            }
        };

        let mut results = Vec::new();
        for volume in volumes {
            let autoclave = self.importer.database().with_conn(|conn| {
                autoclave_repo::find_active_by_volume_serial(conn, &volume.identifier)
            });
            let autoclave = match autoclave {
                Ok(Some(autoclave)) => autoclave,
                Ok(None) => {
                    debug!(volume = %volume.identifier, "Volume not bound to an autoclave");
                    continue;
                }
                Err(e) => {
                    warn!(volume = %volume.identifier, error = %e, "Autoclave lookup failed");
                    continue;
                }
            };

            match folder::scan(&self.importer, &volume.mount_point) {
                Ok(files) => {
                    info!(
                        autoclave = %autoclave.name,
                        volume = %volume.identifier,
                        files = files.len(),
                        "Removable volume scanned"
                    );
                    results.push(VolumeScanResult {
                        autoclave: autoclave.name,
                        serial: volume.identifier,
                        path: volume.mount_point,
                        files,
                    });
                }
                Err(e) => warn!(volume = %volume.identifier, error = %e, "Volume scan failed"),
            }
        }
        results
    }
}
