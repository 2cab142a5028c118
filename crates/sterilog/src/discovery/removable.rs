use std::path::PathBuf;
use std::process::Command;

use serde::Deserialize;
use tracing::debug;

use crate::error::DiscoveryError;

/// A mounted partition of a removable device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovableVolume {
    /// Device serial number, or the device path when the device reports none.
    pub identifier: String,
    pub mount_point: PathBuf,
}

/// Lists mounted removable volumes.
pub trait VolumeEnumerator: Send + Sync {
    fn volumes(&self) -> Result<Vec<RemovableVolume>, DiscoveryError>;
}

/// Enumerates volumes through `lsblk` (util-linux).
#[derive(Debug, Clone, Copy, Default)]
pub struct LsblkEnumerator;

/// Column sets tried in order. util-linux before 2.37 has no
/// `MOUNTPOINTS` column and rejects the whole request.
const LSBLK_COLUMNS: [&str; 2] = [
    "NAME,PATH,SERIAL,RM,TRAN,MOUNTPOINTS",
    "NAME,PATH,SERIAL,RM,TRAN,MOUNTPOINT",
];

impl VolumeEnumerator for LsblkEnumerator {
    fn volumes(&self) -> Result<Vec<RemovableVolume>, DiscoveryError> {
        parse_lsblk(&query_with_fallback(run_lsblk)?)
    }
}

/// Runs `run` with each column set until one is accepted.
fn query_with_fallback(
    mut run: impl FnMut(&str) -> Result<String, DiscoveryError>,
) -> Result<String, DiscoveryError> {
    let mut last_error = DiscoveryError::Enumeration("lsblk not run".to_string());
    for columns in LSBLK_COLUMNS {
        match run(columns) {
            Ok(stdout) => return Ok(stdout),
            Err(e) => {
                debug!(columns, error = %e, "lsblk rejected column set");
                last_error = e;
            }
        }
    }
    Err(last_error)
}

fn run_lsblk(columns: &str) -> Result<String, DiscoveryError> {
    let output = Command::new("lsblk")
        .args(["--json", "--output", columns])
        .output()
        .map_err(|e| DiscoveryError::Enumeration(e.to_string()))?;

    if !output.status.success() {
        return Err(DiscoveryError::Enumeration(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[derive(Debug, Deserialize)]
struct LsblkOutput {
    #[serde(default)]
    blockdevices: Vec<LsblkDevice>,
}

#[derive(Debug, Deserialize)]
struct LsblkDevice {
    name: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    serial: Option<String>,
    /// `true`/`false` on recent util-linux, `"1"`/`"0"` on older releases.
    #[serde(default)]
    rm: serde_json::Value,
    #[serde(default)]
    tran: Option<String>,
    #[serde(default)]
    mountpoint: Option<String>,
    #[serde(default)]
    mountpoints: Vec<Option<String>>,
    #[serde(default)]
    children: Vec<LsblkDevice>,
}

impl LsblkDevice {
    fn is_removable(&self) -> bool {
        let flagged = match &self.rm {
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::String(s) => s == "1",
            serde_json::Value::Number(n) => n.as_u64() == Some(1),
            _ => false,
        };
        flagged || self.tran.as_deref() == Some("usb")
    }

    fn identifier(&self) -> String {
        self.serial
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| self.path.clone())
            .unwrap_or_else(|| format!("/dev/{}", self.name))
    }

    fn collect_mount_points(&self, into: &mut Vec<PathBuf>) {
        let mounts = self
            .mountpoints
            .iter()
            .flatten()
            .chain(self.mountpoint.iter())
            .filter(|m| !m.is_empty() && !m.starts_with('['));
        for mount in mounts {
            let mount = PathBuf::from(mount);
            if !into.contains(&mount) {
                into.push(mount);
            }
        }
        for child in &self.children {
            child.collect_mount_points(into);
        }
    }
}

/// Parses `lsblk --json` output into one entry per mounted partition of
/// every removable or USB-attached disk.
pub fn parse_lsblk(json: &str) -> Result<Vec<RemovableVolume>, DiscoveryError> {
    let output: LsblkOutput = serde_json::from_str(json)
        .map_err(|e| DiscoveryError::Enumeration(format!("invalid lsblk output: {}", e)))?;

    let mut volumes = Vec::new();
    for device in output.blockdevices.iter().filter(|d| d.is_removable()) {
        let identifier = device.identifier();
        let mut mounts = Vec::new();
        device.collect_mount_points(&mut mounts);
        volumes.extend(mounts.into_iter().map(|mount_point| RemovableVolume {
            identifier: identifier.clone(),
            mount_point,
        }));
    }
    Ok(volumes)
}
