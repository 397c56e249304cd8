//! Configuration types for a provisioning run

use crate::aws::ec2::{IngressRule, LaunchTemplateSpec};
use crate::defaults;
use std::path::PathBuf;
use std::time::Duration;

/// AWS credentials and region selection
#[derive(Debug, Clone)]
pub struct AwsConfig {
    /// AWS region
    pub region: String,
    /// AWS profile name (overrides default credential resolution)
    pub aws_profile: Option<String>,
}

/// Security group created for the server
#[derive(Debug, Clone)]
pub struct SecurityGroupConfig {
    pub name: String,
    pub description: String,
    pub ingress: Vec<IngressRule>,
}

/// Key pair created for SSH access
#[derive(Debug, Clone)]
pub struct KeyPairConfig {
    pub name: String,
    /// Path the private key material is written to
    pub key_file: PathBuf,
}

/// Per-wait timeouts
#[derive(Debug, Clone)]
pub struct WaitTimeouts {
    pub instance: Duration,
    pub snapshot: Duration,
    pub volume: Duration,
    pub reachability: Duration,
}

/// Configuration for one provisioning run
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    pub aws: AwsConfig,
    pub security_group: SecurityGroupConfig,
    pub key_pair: KeyPairConfig,
    /// Launch template name and data; `security_group_ids` is filled in at run time
    pub launch_template: LaunchTemplateSpec,
    /// Port probed once the instance is running
    pub http_port: u16,
    pub timeouts: WaitTimeouts,
    /// JSON file to write the provisioned resource ids to
    pub output: Option<PathBuf>,
}

impl Default for WaitTimeouts {
    fn default() -> Self {
        Self {
            instance: defaults::INSTANCE_WAIT_TIMEOUT,
            snapshot: defaults::SNAPSHOT_WAIT_TIMEOUT,
            volume: defaults::VOLUME_WAIT_TIMEOUT,
            reachability: defaults::REACHABILITY_TIMEOUT,
        }
    }
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            aws: AwsConfig {
                region: defaults::DEFAULT_REGION.to_string(),
                aws_profile: None,
            },
            security_group: SecurityGroupConfig {
                name: defaults::SECURITY_GROUP_NAME.to_string(),
                description: defaults::SECURITY_GROUP_DESCRIPTION.to_string(),
                ingress: defaults::INGRESS_PORTS
                    .iter()
                    .map(|(port, description)| {
                        IngressRule::tcp(*port, defaults::INGRESS_CIDR, *description)
                    })
                    .collect(),
            },
            key_pair: KeyPairConfig {
                name: defaults::KEY_PAIR_NAME.to_string(),
                key_file: PathBuf::from(defaults::KEY_FILE),
            },
            launch_template: LaunchTemplateSpec {
                name: defaults::LAUNCH_TEMPLATE_NAME.to_string(),
                image_id: defaults::IMAGE_ID.to_string(),
                instance_type: defaults::INSTANCE_TYPE.to_string(),
                security_group_ids: Vec::new(),
                key_name: defaults::KEY_PAIR_NAME.to_string(),
                name_tag: defaults::INSTANCE_NAME_TAG.to_string(),
                user_data: defaults::USER_DATA.to_string(),
            },
            http_port: defaults::HTTP_PORT,
            timeouts: WaitTimeouts::default(),
            output: None,
        }
    }
}
