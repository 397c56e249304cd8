//! EC2 operations trait for testing

use super::Ec2Client;
use super::types::{CreatedKeyPair, IngressRule, InstanceDetails, LaunchTemplateSpec};
use anyhow::Result;
use aws_sdk_ec2::types::{InstanceStateName, VolumeState};
use std::time::Duration;

/// Trait for EC2 operations that can be mocked in tests.
///
/// One method per call the provisioning flow makes, so the flow can be
/// tested for call order and id threading without hitting real AWS.
#[allow(async_fn_in_trait)]
#[cfg_attr(test, mockall::automock)]
pub trait Ec2Operations: Send + Sync {
    /// Create a security group, returning its ID
    async fn create_security_group(&self, name: &str, description: &str) -> Result<String>;

    /// Add ingress rules to a security group
    async fn authorize_ingress(
        &self,
        security_group_id: &str,
        rules: &[IngressRule],
    ) -> Result<()>;

    /// Create a key pair, returning its ID and private key
    async fn create_key_pair(&self, key_name: &str) -> Result<CreatedKeyPair>;

    /// Create a launch template, returning its ID
    async fn create_launch_template(&self, spec: &LaunchTemplateSpec) -> Result<String>;

    /// Launch one instance from a template, returning its ID
    async fn run_instance(&self, launch_template_id: &str) -> Result<String>;

    /// Describe one instance
    async fn describe_instance(&self, instance_id: &str) -> Result<InstanceDetails>;

    /// Wait for an instance to reach a state
    async fn wait_for_instance_state(
        &self,
        instance_id: &str,
        target: InstanceStateName,
        timeout: Duration,
    ) -> Result<InstanceDetails>;

    /// Resolve a subnet's availability zone
    async fn describe_subnet_zone(&self, subnet_id: &str) -> Result<String>;

    /// Snapshot a volume, returning the snapshot ID
    async fn create_snapshot(&self, volume_id: &str, description: &str) -> Result<String>;

    /// Wait for a snapshot to complete
    async fn wait_for_snapshot_completed(
        &self,
        snapshot_id: &str,
        timeout: Duration,
    ) -> Result<()>;

    /// Create a volume from a snapshot, returning the volume ID
    async fn create_volume_from_snapshot(
        &self,
        snapshot_id: &str,
        availability_zone: &str,
    ) -> Result<String>;

    /// Wait for a volume to reach a state
    async fn wait_for_volume_state(
        &self,
        volume_id: &str,
        target: VolumeState,
        timeout: Duration,
    ) -> Result<()>;

    /// Stop an instance
    async fn stop_instance(&self, instance_id: &str) -> Result<()>;

    /// Start an instance
    async fn start_instance(&self, instance_id: &str) -> Result<()>;

    /// Detach a volume from an instance
    async fn detach_volume(&self, volume_id: &str, instance_id: &str) -> Result<()>;

    /// Attach a volume to an instance at a device name
    async fn attach_volume(
        &self,
        volume_id: &str,
        instance_id: &str,
        device: &str,
    ) -> Result<()>;
}

impl Ec2Operations for Ec2Client {
    async fn create_security_group(&self, name: &str, description: &str) -> Result<String> {
        Ec2Client::create_security_group(self, name, description).await
    }

    async fn authorize_ingress(
        &self,
        security_group_id: &str,
        rules: &[IngressRule],
    ) -> Result<()> {
        Ec2Client::authorize_ingress(self, security_group_id, rules).await
    }

    async fn create_key_pair(&self, key_name: &str) -> Result<CreatedKeyPair> {
        Ec2Client::create_key_pair(self, key_name).await
    }

    async fn create_launch_template(&self, spec: &LaunchTemplateSpec) -> Result<String> {
        Ec2Client::create_launch_template(self, spec).await
    }

    async fn run_instance(&self, launch_template_id: &str) -> Result<String> {
        Ec2Client::run_instance(self, launch_template_id).await
    }

    async fn describe_instance(&self, instance_id: &str) -> Result<InstanceDetails> {
        Ec2Client::describe_instance(self, instance_id).await
    }

    async fn wait_for_instance_state(
        &self,
        instance_id: &str,
        target: InstanceStateName,
        timeout: Duration,
    ) -> Result<InstanceDetails> {
        Ec2Client::wait_for_instance_state(self, instance_id, target, timeout).await
    }

    async fn describe_subnet_zone(&self, subnet_id: &str) -> Result<String> {
        Ec2Client::describe_subnet_zone(self, subnet_id).await
    }

    async fn create_snapshot(&self, volume_id: &str, description: &str) -> Result<String> {
        Ec2Client::create_snapshot(self, volume_id, description).await
    }

    async fn wait_for_snapshot_completed(
        &self,
        snapshot_id: &str,
        timeout: Duration,
    ) -> Result<()> {
        Ec2Client::wait_for_snapshot_completed(self, snapshot_id, timeout).await
    }

    async fn create_volume_from_snapshot(
        &self,
        snapshot_id: &str,
        availability_zone: &str,
    ) -> Result<String> {
        Ec2Client::create_volume_from_snapshot(self, snapshot_id, availability_zone).await
    }

    async fn wait_for_volume_state(
        &self,
        volume_id: &str,
        target: VolumeState,
        timeout: Duration,
    ) -> Result<()> {
        Ec2Client::wait_for_volume_state(self, volume_id, target, timeout).await
    }

    async fn stop_instance(&self, instance_id: &str) -> Result<()> {
        Ec2Client::stop_instance(self, instance_id).await
    }

    async fn start_instance(&self, instance_id: &str) -> Result<()> {
        Ec2Client::start_instance(self, instance_id).await
    }

    async fn detach_volume(&self, volume_id: &str, instance_id: &str) -> Result<()> {
        Ec2Client::detach_volume(self, volume_id, instance_id).await
    }

    async fn attach_volume(&self, volume_id: &str, instance_id: &str, device: &str) -> Result<()> {
        Ec2Client::attach_volume(self, volume_id, instance_id, device).await
    }
}
