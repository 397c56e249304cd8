//! The provisioning flow
//!
//! A fixed sequence of EC2 calls, each gated on the previous one. Ids
//! returned by one call are fed into the next and recorded in
//! [`ProvisionedResources`]. The first error ends the run; nothing already
//! created is cleaned up.

mod resources;

pub use resources::ProvisionedResources;

use crate::aws::context::AwsContext;
use crate::aws::ec2::{Ec2Client, Ec2Operations, InstanceDetails, KeyFile};
use crate::config::ProvisionConfig;
use crate::defaults;
use crate::probe::{ReachabilityProbe, TcpProbe};
use anyhow::{Context, Result};
use aws_sdk_ec2::types::{InstanceStateName, VolumeState};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Runs the provisioning flow against one EC2 API and one reachability probe
pub struct Provisioner<'a, E, P> {
    ec2: &'a E,
    probe: &'a P,
    config: &'a ProvisionConfig,
    resources: ProvisionedResources,
    /// Opened by preflight, consumed once the key material arrives
    key_file: Option<KeyFile>,
}

impl<'a, E: Ec2Operations, P: ReachabilityProbe> Provisioner<'a, E, P> {
    pub fn new(ec2: &'a E, probe: &'a P, config: &'a ProvisionConfig, run_id: &str) -> Self {
        Self {
            ec2,
            probe,
            config,
            resources: ProvisionedResources::new(run_id, &config.aws.region),
            key_file: None,
        }
    }

    pub fn resources(&self) -> &ProvisionedResources {
        &self.resources
    }

    pub fn into_resources(self) -> ProvisionedResources {
        self.resources
    }

    /// Run every step in order, stopping at the first failure
    pub async fn run(&mut self) -> Result<()> {
        self.preflight()?;
        let result = self.run_steps().await;
        if let Some(key_file) = self.key_file.take() {
            key_file.discard();
        }
        result
    }

    async fn run_steps(&mut self) -> Result<()> {
        let security_group_id = self.setup_security_group().await?;
        self.create_key_pair().await?;
        let instance = self.launch_instance(&security_group_id).await?;
        self.wait_until_reachable(&instance).await?;
        let restored_volume_id = self.backup_root_volume(&instance).await?;
        self.swap_root_volume(&instance, &restored_volume_id).await?;
        Ok(())
    }

    /// Checks that need no AWS call. The AMI only exists in the default
    /// region, and the key file is created up front since the private key
    /// can only be fetched once.
    fn preflight(&mut self) -> Result<()> {
        let region = &self.config.aws.region;
        if region != defaults::DEFAULT_REGION {
            anyhow::bail!(
                "Region {} is not supported: image {} only exists in {}",
                region,
                self.config.launch_template.image_id,
                defaults::DEFAULT_REGION
            );
        }

        self.key_file = Some(KeyFile::create(&self.config.key_pair.key_file)?);
        Ok(())
    }

    #[instrument(skip_all, fields(name = %self.config.security_group.name))]
    async fn setup_security_group(&mut self) -> Result<String> {
        let sg = &self.config.security_group;
        let security_group_id = self
            .ec2
            .create_security_group(&sg.name, &sg.description)
            .await?;
        self.resources.security_group_id = Some(security_group_id.clone());

        self.ec2
            .authorize_ingress(&security_group_id, &sg.ingress)
            .await?;

        Ok(security_group_id)
    }

    #[instrument(skip_all, fields(key_name = %self.config.key_pair.name))]
    async fn create_key_pair(&mut self) -> Result<()> {
        let key_pair = self.ec2.create_key_pair(&self.config.key_pair.name).await?;
        self.resources.key_pair_id = Some(key_pair.key_pair_id.clone());
        self.resources.key_name = Some(key_pair.key_name.clone());

        let key_file = self
            .key_file
            .take()
            .context("Key file was not created before the key pair")?;
        self.resources.key_file = Some(key_file.write(&key_pair.key_material)?);
        Ok(())
    }

    /// Launch template, instance, wait for `running`, then read back where
    /// it landed
    #[instrument(skip_all, fields(sg_id = %security_group_id))]
    async fn launch_instance(&mut self, security_group_id: &str) -> Result<InstanceDetails> {
        let mut template = self.config.launch_template.clone();
        template.security_group_ids = vec![security_group_id.to_string()];
        if let Some(key_name) = &self.resources.key_name {
            template.key_name = key_name.clone();
        }

        let launch_template_id = self.ec2.create_launch_template(&template).await?;
        self.resources.launch_template_id = Some(launch_template_id.clone());

        let instance_id = self.ec2.run_instance(&launch_template_id).await?;
        self.resources.instance_id = Some(instance_id.clone());

        self.ec2
            .wait_for_instance_state(
                &instance_id,
                InstanceStateName::Running,
                self.config.timeouts.instance,
            )
            .await?;

        let instance = self.ec2.describe_instance(&instance_id).await?;
        let subnet_id = instance.require_subnet_id()?;
        self.resources.subnet_id = Some(subnet_id.to_string());
        self.resources.public_ip = instance.public_ip.clone();
        self.resources.root_device_name = instance.root_device_name.clone();
        self.resources.original_volume_id = instance.root_volume_id.clone();

        let zone = self.ec2.describe_subnet_zone(subnet_id).await?;
        if let Some(placed) = instance.availability_zone.as_deref() {
            if placed != zone {
                warn!(
                    instance_zone = %placed,
                    subnet_zone = %zone,
                    "Instance placement and subnet report different zones"
                );
            }
        }
        self.resources.availability_zone = Some(zone);

        info!(
            instance_id = %instance.instance_id,
            public_ip = ?instance.public_ip,
            root_volume_id = ?instance.root_volume_id,
            "Instance is running"
        );
        Ok(instance)
    }

    #[instrument(skip_all, fields(instance_id = %instance.instance_id))]
    async fn wait_until_reachable(&self, instance: &InstanceDetails) -> Result<()> {
        let public_ip = instance.require_public_ip()?;
        self.probe
            .wait_until_reachable(
                public_ip,
                self.config.http_port,
                self.config.timeouts.reachability,
            )
            .await
            .with_context(|| format!("Web server at {} never became reachable", public_ip))
    }

    /// Snapshot the root volume and restore it into a new volume in the
    /// instance's zone. Returns the new volume id.
    #[instrument(skip_all, fields(instance_id = %instance.instance_id))]
    async fn backup_root_volume(&mut self, instance: &InstanceDetails) -> Result<String> {
        let volume_id = instance.require_root_volume_id()?;
        let zone = self
            .resources
            .availability_zone
            .clone()
            .context("Availability zone unknown before backup")?;

        let description = format!("{}-backup", self.config.launch_template.name_tag);
        let snapshot_id = self.ec2.create_snapshot(volume_id, &description).await?;
        self.resources.snapshot_id = Some(snapshot_id.clone());

        self.ec2
            .wait_for_snapshot_completed(&snapshot_id, self.config.timeouts.snapshot)
            .await?;

        let restored_volume_id = self
            .ec2
            .create_volume_from_snapshot(&snapshot_id, &zone)
            .await?;
        self.resources.restored_volume_id = Some(restored_volume_id.clone());

        self.ec2
            .wait_for_volume_state(
                &restored_volume_id,
                VolumeState::Available,
                self.config.timeouts.volume,
            )
            .await?;

        info!(
            snapshot_id = %snapshot_id,
            volume_id = %restored_volume_id,
            "Backup restored into new volume"
        );
        Ok(restored_volume_id)
    }

    /// Stop, replace the root volume with the restored one, start again
    #[instrument(
        skip_all,
        fields(instance_id = %instance.instance_id, new_volume_id = %restored_volume_id)
    )]
    async fn swap_root_volume(
        &mut self,
        instance: &InstanceDetails,
        restored_volume_id: &str,
    ) -> Result<()> {
        let instance_id = instance.instance_id.as_str();
        let old_volume_id = instance.require_root_volume_id()?;
        let root_device = instance.require_root_device_name()?;
        let timeouts = &self.config.timeouts;

        self.ec2.stop_instance(instance_id).await?;
        self.ec2
            .wait_for_instance_state(instance_id, InstanceStateName::Stopped, timeouts.instance)
            .await?;

        self.ec2.detach_volume(old_volume_id, instance_id).await?;
        self.ec2
            .wait_for_volume_state(old_volume_id, VolumeState::Available, timeouts.volume)
            .await?;

        self.ec2
            .attach_volume(restored_volume_id, instance_id, root_device)
            .await?;
        self.ec2
            .wait_for_volume_state(restored_volume_id, VolumeState::InUse, timeouts.volume)
            .await?;

        self.ec2.start_instance(instance_id).await?;
        let restarted = self
            .ec2
            .wait_for_instance_state(instance_id, InstanceStateName::Running, timeouts.instance)
            .await?;
        self.resources.public_ip_after_restore = restarted.public_ip.clone();

        info!(
            instance_id = %instance_id,
            public_ip = ?restarted.public_ip,
            old_volume_id = %old_volume_id,
            "Instance restarted on restored volume"
        );
        Ok(())
    }
}

/// Provision against real AWS using the given configuration.
///
/// On failure the error is returned after logging (and, with `output` set,
/// writing) the resources created so far.
pub async fn run_provision(config: ProvisionConfig) -> Result<ProvisionedResources> {
    let run_id = Uuid::now_v7().to_string();
    info!(run_id = %run_id, region = %config.aws.region, "Starting provisioning run");

    let aws =
        AwsContext::with_profile(&config.aws.region, config.aws.aws_profile.as_deref()).await;
    let ec2 = Ec2Client::from_context(&aws, &run_id);
    let probe = TcpProbe::default();

    let mut provisioner = Provisioner::new(&ec2, &probe, &config, &run_id);
    let result = provisioner.run().await;
    let resources = provisioner.into_resources();

    if let Some(path) = &config.output {
        if let Err(e) = resources.write_json(path) {
            warn!(error = ?e, "Could not write resource summary");
        }
    }

    match result {
        Ok(()) => Ok(resources),
        Err(e) => {
            for (kind, id) in resources.created() {
                warn!(kind, id, "Resource left in place after failure");
            }
            Err(e)
        }
    }
}
