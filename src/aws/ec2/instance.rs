//! EC2 instance lifecycle operations

use super::Ec2Client;
use super::types::InstanceDetails;
use crate::aws::error::not_found_as_none;
use crate::wait::{WaitConfig, wait_for_resource};
use anyhow::{Context, Result};
use aws_sdk_ec2::types::{InstanceStateName, LaunchTemplateSpecification};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info};

/// States from which `target` can no longer be reached.
///
/// Mirrors the failure acceptors of the SDK's `instance_running` and
/// `instance_stopped` waiters.
pub(crate) fn is_unreachable_state(
    target: &InstanceStateName,
    observed: &InstanceStateName,
) -> bool {
    match target {
        InstanceStateName::Running => matches!(
            observed,
            InstanceStateName::ShuttingDown
                | InstanceStateName::Terminated
                | InstanceStateName::Stopping
        ),
        InstanceStateName::Stopped => matches!(
            observed,
            InstanceStateName::Pending
                | InstanceStateName::ShuttingDown
                | InstanceStateName::Terminated
        ),
        _ => observed == &InstanceStateName::Terminated,
    }
}

impl Ec2Client {
    /// Launch one instance from a launch template
    ///
    /// # Returns
    /// The instance ID
    pub async fn run_instance(&self, launch_template_id: &str) -> Result<String> {
        info!(launch_template_id = %launch_template_id, "Launching instance");

        let response = self
            .client
            .run_instances()
            .launch_template(
                LaunchTemplateSpecification::builder()
                    .launch_template_id(launch_template_id)
                    .build(),
            )
            .min_count(1)
            .max_count(1)
            .send()
            .await
            .map_err(aws_sdk_ec2::Error::from)
            .context("Failed to launch instance")?;

        let instance_id = response
            .instances()
            .first()
            .context("No instance returned")?
            .instance_id()
            .context("No instance ID")?
            .to_string();

        info!(instance_id = %instance_id, "Instance launched");
        Ok(instance_id)
    }

    /// Describe a single instance
    pub async fn describe_instance(&self, instance_id: &str) -> Result<InstanceDetails> {
        let response = self
            .client
            .describe_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .map_err(aws_sdk_ec2::Error::from)
            .context("Failed to describe instance")?;

        let instance = response
            .reservations()
            .first()
            .and_then(|r| r.instances().first())
            .with_context(|| format!("Instance {} not found", instance_id))?;

        InstanceDetails::from_instance(instance)
    }

    /// Wait for an instance to reach `target` and return its description at that point
    pub async fn wait_for_instance_state(
        &self,
        instance_id: &str,
        target: InstanceStateName,
        timeout: Duration,
    ) -> Result<InstanceDetails> {
        info!(
            instance_id = %instance_id,
            target = %target.as_str(),
            timeout_secs = timeout.as_secs(),
            "Waiting for instance state"
        );

        let reached: OnceLock<InstanceDetails> = OnceLock::new();

        wait_for_resource(
            WaitConfig::ec2_polling(timeout),
            || {
                let reached = &reached;
                let target = &target;
                async move {
                    let Some(details) =
                        not_found_as_none(self.describe_instance(instance_id).await)?
                    else {
                        debug!(instance_id = %instance_id, "Instance not visible yet");
                        return Ok(false);
                    };

                    if &details.state == target {
                        info!(
                            instance_id = %instance_id,
                            state = %details.state.as_str(),
                            public_ip = ?details.public_ip,
                            "Instance reached state"
                        );
                        let _ = reached.set(details);
                        return Ok(true);
                    }

                    if is_unreachable_state(target, &details.state) {
                        let reason = self
                            .state_reason(instance_id)
                            .await
                            .unwrap_or_else(|| "No state reason provided by AWS".to_string());
                        anyhow::bail!(
                            "Instance {} entered state {} while waiting for {}\n{}",
                            instance_id,
                            details.state.as_str(),
                            target.as_str(),
                            reason
                        );
                    }

                    Ok(false)
                }
            },
            &format!("EC2 instance {} {}", instance_id, target.as_str()),
        )
        .await?;

        reached
            .into_inner()
            .with_context(|| format!("No description recorded for instance {}", instance_id))
    }

    /// Best-effort lookup of why an instance changed state
    async fn state_reason(&self, instance_id: &str) -> Option<String> {
        let response = self
            .client
            .describe_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .ok()?;
        let reason = response
            .reservations()
            .first()
            .and_then(|r| r.instances().first())
            .and_then(|i| i.state_reason())?;
        Some(format!(
            "Reason code: {}\nReason: {}",
            reason.code().unwrap_or("unknown"),
            reason.message().unwrap_or("no message provided")
        ))
    }

    /// Stop an instance (its EBS volumes are kept)
    pub async fn stop_instance(&self, instance_id: &str) -> Result<()> {
        info!(instance_id = %instance_id, "Stopping instance");

        self.client
            .stop_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .map_err(aws_sdk_ec2::Error::from)
            .context("Failed to stop instance")?;

        Ok(())
    }

    /// Start a stopped instance
    pub async fn start_instance(&self, instance_id: &str) -> Result<()> {
        info!(instance_id = %instance_id, "Starting instance");

        self.client
            .start_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .map_err(aws_sdk_ec2::Error::from)
            .context("Failed to start instance")?;

        Ok(())
    }

    /// Look up the availability zone of a subnet
    pub async fn describe_subnet_zone(&self, subnet_id: &str) -> Result<String> {
        let response = self
            .client
            .describe_subnets()
            .subnet_ids(subnet_id)
            .send()
            .await
            .map_err(aws_sdk_ec2::Error::from)
            .context("Failed to describe subnet")?;

        let zone = response
            .subnets()
            .first()
            .with_context(|| format!("Subnet {} not found", subnet_id))?
            .availability_zone()
            .with_context(|| format!("Subnet {} has no availability zone", subnet_id))?
            .to_string();

        debug!(subnet_id = %subnet_id, zone = %zone, "Resolved subnet availability zone");
        Ok(zone)
    }
}
