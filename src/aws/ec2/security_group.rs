//! Security group management

use super::Ec2Client;
use super::types::IngressRule;
use crate::aws::tags::{self, TAG_NAME};
use anyhow::{Context, Result};
use aws_sdk_ec2::types::ResourceType;
use tracing::{debug, info};

impl Ec2Client {
    /// Create a security group in the default VPC
    ///
    /// # Returns
    /// The security group ID
    pub async fn create_security_group(&self, name: &str, description: &str) -> Result<String> {
        info!(name = %name, "Creating security group");

        let response = self
            .client
            .create_security_group()
            .group_name(name)
            .description(description)
            .tag_specifications(tags::ec2_tag_spec(
                ResourceType::SecurityGroup,
                self.run_id(),
                &[(TAG_NAME, name)],
            ))
            .send()
            .await
            .map_err(aws_sdk_ec2::Error::from)
            .context("Failed to create security group")?;

        let sg_id = response
            .group_id()
            .context("No security group ID in response")?
            .to_string();

        info!(sg_id = %sg_id, "Created security group");
        Ok(sg_id)
    }

    /// Add ingress rules to a security group in a single call
    pub async fn authorize_ingress(
        &self,
        security_group_id: &str,
        rules: &[IngressRule],
    ) -> Result<()> {
        info!(
            sg_id = %security_group_id,
            ports = ?rules.iter().map(|r| r.from_port).collect::<Vec<_>>(),
            "Adding ingress rules"
        );

        self.client
            .authorize_security_group_ingress()
            .group_id(security_group_id)
            .set_ip_permissions(Some(rules.iter().map(IngressRule::to_ip_permission).collect()))
            .send()
            .await
            .map_err(aws_sdk_ec2::Error::from)
            .context("Failed to add ingress rules to security group")?;

        debug!(sg_id = %security_group_id, count = rules.len(), "Ingress rules added");
        Ok(())
    }
}
