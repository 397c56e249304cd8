//! EC2 request and response types

use anyhow::{Context, Result};
use aws_sdk_ec2::types::{Instance, InstanceStateName, IpPermission, IpRange};
use base64::Engine;

/// One ingress rule opened on the security group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressRule {
    pub protocol: String,
    pub from_port: i32,
    pub to_port: i32,
    pub cidr: String,
    pub description: String,
}

impl IngressRule {
    /// Single-port TCP rule
    pub fn tcp(port: i32, cidr: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            protocol: "tcp".to_string(),
            from_port: port,
            to_port: port,
            cidr: cidr.into(),
            description: description.into(),
        }
    }

    pub(crate) fn to_ip_permission(&self) -> IpPermission {
        IpPermission::builder()
            .ip_protocol(&self.protocol)
            .from_port(self.from_port)
            .to_port(self.to_port)
            .ip_ranges(
                IpRange::builder()
                    .cidr_ip(&self.cidr)
                    .description(&self.description)
                    .build(),
            )
            .build()
    }
}

/// Launch template name and data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchTemplateSpec {
    pub name: String,
    pub image_id: String,
    /// EC2 instance type (e.g., "t2.micro")
    pub instance_type: String,
    pub security_group_ids: Vec<String>,
    pub key_name: String,
    /// Value of the instance `Name` tag
    pub name_tag: String,
    /// Boot script, plain text (encoded on send)
    pub user_data: String,
}

impl LaunchTemplateSpec {
    /// User data as EC2 expects it: standard base64
    pub fn user_data_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.user_data.as_bytes())
    }
}

/// Key pair returned by CreateKeyPair
#[derive(Clone)]
pub struct CreatedKeyPair {
    pub key_pair_id: String,
    pub key_name: String,
    /// Unencrypted PEM private key; AWS returns it exactly once
    pub key_material: String,
}

impl std::fmt::Debug for CreatedKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreatedKeyPair")
            .field("key_pair_id", &self.key_pair_id)
            .field("key_name", &self.key_name)
            .finish_non_exhaustive()
    }
}

/// Facts read from one DescribeInstances response
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceDetails {
    pub instance_id: String,
    pub state: InstanceStateName,
    pub public_ip: Option<String>,
    pub subnet_id: Option<String>,
    pub availability_zone: Option<String>,
    pub root_device_name: Option<String>,
    /// EBS volume mapped at `root_device_name`
    pub root_volume_id: Option<String>,
}

impl InstanceDetails {
    pub fn from_instance(instance: &Instance) -> Result<Self> {
        let instance_id = instance
            .instance_id()
            .context("No instance ID in response")?
            .to_string();

        let state = instance
            .state()
            .and_then(|s| s.name())
            .cloned()
            .unwrap_or(InstanceStateName::Pending);

        let root_device_name = instance.root_device_name().map(|s| s.to_string());
        let root_volume_id = root_device_name.as_deref().and_then(|root| {
            instance
                .block_device_mappings()
                .iter()
                .find(|m| m.device_name() == Some(root))
                .and_then(|m| m.ebs())
                .and_then(|ebs| ebs.volume_id())
                .map(|s| s.to_string())
        });

        Ok(Self {
            instance_id,
            state,
            public_ip: instance.public_ip_address().map(|s| s.to_string()),
            subnet_id: instance.subnet_id().map(|s| s.to_string()),
            availability_zone: instance
                .placement()
                .and_then(|p| p.availability_zone())
                .map(|s| s.to_string()),
            root_device_name,
            root_volume_id,
        })
    }

    pub fn require_public_ip(&self) -> Result<&str> {
        self.public_ip
            .as_deref()
            .with_context(|| format!("Instance {} has no public IP address", self.instance_id))
    }

    pub fn require_subnet_id(&self) -> Result<&str> {
        self.subnet_id
            .as_deref()
            .with_context(|| format!("Instance {} has no subnet", self.instance_id))
    }

    pub fn require_root_device_name(&self) -> Result<&str> {
        self.root_device_name
            .as_deref()
            .with_context(|| format!("Instance {} has no root device name", self.instance_id))
    }

    pub fn require_root_volume_id(&self) -> Result<&str> {
        self.root_volume_id.as_deref().with_context(|| {
            format!(
                "Instance {} has no EBS volume at its root device",
                self.instance_id
            )
        })
    }
}
