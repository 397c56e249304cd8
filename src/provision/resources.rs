//! Record of the resources a run has created

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// Every identifier minted by a run, filled in as the flow progresses.
///
/// Nothing is ever deleted, so after a failure this is the list of what is
/// left behind in the account.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ProvisionedResources {
    pub run_id: String,
    pub region: String,
    pub security_group_id: Option<String>,
    pub key_pair_id: Option<String>,
    pub key_name: Option<String>,
    pub key_file: Option<PathBuf>,
    pub launch_template_id: Option<String>,
    pub instance_id: Option<String>,
    pub subnet_id: Option<String>,
    pub availability_zone: Option<String>,
    pub root_device_name: Option<String>,
    /// Boot volume the instance was launched with (detached, not deleted)
    pub original_volume_id: Option<String>,
    pub snapshot_id: Option<String>,
    /// Volume restored from the snapshot and attached as the new root
    pub restored_volume_id: Option<String>,
    pub public_ip: Option<String>,
    /// Public IP after the restart (a new one unless an Elastic IP is attached)
    pub public_ip_after_restore: Option<String>,
}

impl ProvisionedResources {
    pub fn new(run_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            region: region.into(),
            ..Default::default()
        }
    }

    /// (kind, id) pairs for the AWS resources created so far
    pub fn created(&self) -> Vec<(&'static str, &str)> {
        [
            ("security-group", &self.security_group_id),
            ("key-pair", &self.key_pair_id),
            ("launch-template", &self.launch_template_id),
            ("instance", &self.instance_id),
            ("snapshot", &self.snapshot_id),
            ("volume", &self.restored_volume_id),
        ]
        .into_iter()
        .filter_map(|(kind, id)| id.as_deref().map(|id| (kind, id)))
        .collect()
    }

    /// Write as pretty JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize resources")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Wrote resource summary");
        Ok(())
    }
}

impl fmt::Display for ProvisionedResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows: [(&str, Option<String>); 14] = [
            ("Run ID", Some(self.run_id.clone())),
            ("Region", Some(self.region.clone())),
            ("Security group", self.security_group_id.clone()),
            ("Key pair", self.key_pair_id.clone()),
            (
                "Key file",
                self.key_file.as_ref().map(|p| p.display().to_string()),
            ),
            ("Launch template", self.launch_template_id.clone()),
            ("Instance", self.instance_id.clone()),
            ("Availability zone", self.availability_zone.clone()),
            ("Original volume", self.original_volume_id.clone()),
            ("Snapshot", self.snapshot_id.clone()),
            ("Restored volume", self.restored_volume_id.clone()),
            ("Root device", self.root_device_name.clone()),
            ("Public IP (initial)", self.public_ip.clone()),
            ("Public IP (restored)", self.public_ip_after_restore.clone()),
        ];
        for (label, value) in rows {
            writeln!(f, "{:<22} {}", label, value.as_deref().unwrap_or("-"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_lists_only_minted_resources_in_order() {
        let mut resources = ProvisionedResources::new("run-1", "us-east-1");
        assert!(resources.created().is_empty());

        resources.security_group_id = Some("sg-1".to_string());
        resources.instance_id = Some("i-1".to_string());
        resources.subnet_id = Some("subnet-1".to_string());

        assert_eq!(
            resources.created(),
            vec![("security-group", "sg-1"), ("instance", "i-1")]
        );
    }

    #[test]
    fn writes_json_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resources.json");

        let mut resources = ProvisionedResources::new("run-1", "us-east-1");
        resources.snapshot_id = Some("snap-1".to_string());
        resources.write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["run_id"], "run-1");
        assert_eq!(value["snapshot_id"], "snap-1");
        assert!(value["instance_id"].is_null());
    }

    #[test]
    fn display_marks_missing_values() {
        let mut resources = ProvisionedResources::new("run-1", "us-east-1");
        resources.instance_id = Some("i-1".to_string());
        let text = resources.to_string();
        assert!(text.contains("Instance               i-1"));
        assert!(text.contains("Snapshot               -"));
    }
}
