//! EC2 client for the web server provisioning flow

mod instance;
mod key_pair;
mod launch_template;
mod operations;
mod security_group;
mod types;
mod volume;

pub use key_pair::KeyFile;
pub use operations::Ec2Operations;
pub use types::{CreatedKeyPair, IngressRule, InstanceDetails, LaunchTemplateSpec};

#[cfg(test)]
pub use operations::MockEc2Operations;

use crate::aws::context::AwsContext;
use aws_sdk_ec2::Client;

/// Thin wrapper around the EC2 SDK client: one method per API call used by
/// the provisioning flow, plus the state waits between them.
///
/// Every resource it creates is tagged with `run_id`.
pub struct Ec2Client {
    pub(crate) client: Client,
    run_id: String,
}

impl Ec2Client {
    /// Create a new EC2 client (loads AWS config from environment)
    pub async fn new(region: &str, run_id: impl Into<String>) -> Self {
        let ctx = AwsContext::new(region).await;
        Self::from_context(&ctx, run_id)
    }

    /// Create an EC2 client from a pre-loaded AWS context
    pub fn from_context(ctx: &AwsContext, run_id: impl Into<String>) -> Self {
        Self {
            client: ctx.ec2_client(),
            run_id: run_id.into(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}
