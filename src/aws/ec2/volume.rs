//! EBS snapshot and volume operations

use super::Ec2Client;
use crate::aws::error::not_found_as_none;
use crate::aws::tags::{self, TAG_NAME};
use crate::wait::{WaitConfig, wait_for_resource};
use anyhow::{Context, Result};
use aws_sdk_ec2::types::{ResourceType, Snapshot, SnapshotState, VolumeState};
use std::time::Duration;
use tracing::{debug, info};

/// Volume states no wait can recover from
fn is_failed_volume_state(state: &VolumeState) -> bool {
    matches!(
        state,
        VolumeState::Error | VolumeState::Deleting | VolumeState::Deleted
    )
}

/// Whether a described snapshot is done; a snapshot in `error` fails the wait
fn snapshot_ready(snapshot: &Snapshot) -> Result<bool> {
    let snapshot_id = snapshot.snapshot_id().unwrap_or("unknown");
    match snapshot.state() {
        Some(SnapshotState::Completed) => Ok(true),
        Some(SnapshotState::Error) => anyhow::bail!(
            "Snapshot {} failed: {}",
            snapshot_id,
            snapshot.state_message().unwrap_or("no message provided")
        ),
        state => {
            debug!(
                snapshot_id = %snapshot_id,
                state = ?state,
                progress = ?snapshot.progress(),
                "Snapshot in progress"
            );
            Ok(false)
        }
    }
}

/// Whether a volume has reached `target`; a failed state ends the wait
fn volume_ready(
    volume_id: &str,
    state: Option<&VolumeState>,
    target: &VolumeState,
) -> Result<bool> {
    match state {
        Some(s) if s == target => Ok(true),
        Some(s) if is_failed_volume_state(s) => anyhow::bail!(
            "Volume {} entered state {} while waiting for {}",
            volume_id,
            s.as_str(),
            target.as_str()
        ),
        _ => Ok(false),
    }
}

impl Ec2Client {
    /// Snapshot a volume
    ///
    /// # Returns
    /// The snapshot ID
    pub async fn create_snapshot(&self, volume_id: &str, description: &str) -> Result<String> {
        info!(volume_id = %volume_id, "Creating snapshot");

        let response = self
            .client
            .create_snapshot()
            .volume_id(volume_id)
            .description(description)
            .tag_specifications(tags::ec2_tag_spec(
                ResourceType::Snapshot,
                self.run_id(),
                &[(TAG_NAME, description)],
            ))
            .send()
            .await
            .map_err(aws_sdk_ec2::Error::from)
            .context("Failed to create snapshot")?;

        let snapshot_id = response
            .snapshot_id()
            .context("No snapshot ID in response")?
            .to_string();

        info!(snapshot_id = %snapshot_id, volume_id = %volume_id, "Snapshot started");
        Ok(snapshot_id)
    }

    /// Wait for a snapshot to reach `completed`
    pub async fn wait_for_snapshot_completed(
        &self,
        snapshot_id: &str,
        timeout: Duration,
    ) -> Result<()> {
        info!(
            snapshot_id = %snapshot_id,
            timeout_secs = timeout.as_secs(),
            "Waiting for snapshot to complete"
        );

        wait_for_resource(
            WaitConfig::ec2_polling(timeout),
            || async move {
                let response = self
                    .client
                    .describe_snapshots()
                    .snapshot_ids(snapshot_id)
                    .send()
                    .await
                    .map_err(aws_sdk_ec2::Error::from)
                    .context("Failed to describe snapshot");

                let Some(response) = not_found_as_none(response)? else {
                    debug!(snapshot_id = %snapshot_id, "Snapshot not visible yet");
                    return Ok(false);
                };

                let Some(snapshot) = response.snapshots().first() else {
                    return Ok(false);
                };
                let ready = snapshot_ready(snapshot)?;
                if ready {
                    info!(snapshot_id = %snapshot_id, "Snapshot completed");
                }
                Ok(ready)
            },
            &format!("EBS snapshot {} completed", snapshot_id),
        )
        .await
    }

    /// Create a volume from a snapshot in the given availability zone
    ///
    /// # Returns
    /// The new volume ID
    pub async fn create_volume_from_snapshot(
        &self,
        snapshot_id: &str,
        availability_zone: &str,
    ) -> Result<String> {
        info!(
            snapshot_id = %snapshot_id,
            availability_zone = %availability_zone,
            "Creating volume from snapshot"
        );

        let response = self
            .client
            .create_volume()
            .snapshot_id(snapshot_id)
            .availability_zone(availability_zone)
            .tag_specifications(tags::ec2_tag_spec(
                ResourceType::Volume,
                self.run_id(),
                &[],
            ))
            .send()
            .await
            .map_err(aws_sdk_ec2::Error::from)
            .context("Failed to create volume")?;

        let volume_id = response
            .volume_id()
            .context("No volume ID in response")?
            .to_string();

        info!(volume_id = %volume_id, "Volume created");
        Ok(volume_id)
    }

    /// Wait for a volume to reach `target` (`available` or `in-use`)
    pub async fn wait_for_volume_state(
        &self,
        volume_id: &str,
        target: VolumeState,
        timeout: Duration,
    ) -> Result<()> {
        info!(
            volume_id = %volume_id,
            target = %target.as_str(),
            timeout_secs = timeout.as_secs(),
            "Waiting for volume state"
        );

        wait_for_resource(
            WaitConfig::ec2_polling(timeout),
            || {
                let target = &target;
                async move {
                    let response = self
                        .client
                        .describe_volumes()
                        .volume_ids(volume_id)
                        .send()
                        .await
                        .map_err(aws_sdk_ec2::Error::from)
                        .context("Failed to describe volume");

                    let Some(response) = not_found_as_none(response)? else {
                        debug!(volume_id = %volume_id, "Volume not visible yet");
                        return Ok(false);
                    };

                    let state = response.volumes().first().and_then(|v| v.state());
                    let ready = volume_ready(volume_id, state, target)?;
                    if ready {
                        info!(
                            volume_id = %volume_id,
                            state = %target.as_str(),
                            "Volume reached state"
                        );
                    }
                    Ok(ready)
                }
            },
            &format!("EBS volume {} {}", volume_id, target.as_str()),
        )
        .await
    }

    /// Detach a volume from an instance
    pub async fn detach_volume(&self, volume_id: &str, instance_id: &str) -> Result<()> {
        info!(volume_id = %volume_id, instance_id = %instance_id, "Detaching volume");

        self.client
            .detach_volume()
            .volume_id(volume_id)
            .instance_id(instance_id)
            .send()
            .await
            .map_err(aws_sdk_ec2::Error::from)
            .context("Failed to detach volume")?;

        Ok(())
    }

    /// Attach a volume to an instance at `device` (e.g. "/dev/xvda")
    pub async fn attach_volume(
        &self,
        volume_id: &str,
        instance_id: &str,
        device: &str,
    ) -> Result<()> {
        info!(
            volume_id = %volume_id,
            instance_id = %instance_id,
            device = %device,
            "Attaching volume"
        );

        self.client
            .attach_volume()
            .volume_id(volume_id)
            .instance_id(instance_id)
            .device(device)
            .send()
            .await
            .map_err(aws_sdk_ec2::Error::from)
            .context("Failed to attach volume")?;

        Ok(())
    }
}
