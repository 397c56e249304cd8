//! Launch template creation

use super::Ec2Client;
use super::types::LaunchTemplateSpec;
use crate::aws::tags::{self, TAG_NAME};
use anyhow::{Context, Result};
use aws_sdk_ec2::types::{
    InstanceType, LaunchTemplateTagSpecificationRequest, RequestLaunchTemplateData, ResourceType,
    Tag,
};
use tracing::info;

/// Build the template data: image, type, groups, key, instance Name tag and
/// base64 user data.
fn launch_template_data(spec: &LaunchTemplateSpec) -> RequestLaunchTemplateData {
    RequestLaunchTemplateData::builder()
        .image_id(&spec.image_id)
        .instance_type(InstanceType::from(spec.instance_type.as_str()))
        .set_security_group_ids(Some(spec.security_group_ids.clone()))
        .key_name(&spec.key_name)
        .tag_specifications(
            LaunchTemplateTagSpecificationRequest::builder()
                .resource_type(ResourceType::Instance)
                .tags(Tag::builder().key(TAG_NAME).value(&spec.name_tag).build())
                .build(),
        )
        .user_data(spec.user_data_base64())
        .build()
}

impl Ec2Client {
    /// Create a launch template
    ///
    /// # Returns
    /// The launch template ID
    pub async fn create_launch_template(&self, spec: &LaunchTemplateSpec) -> Result<String> {
        info!(
            name = %spec.name,
            image_id = %spec.image_id,
            instance_type = %spec.instance_type,
            "Creating launch template"
        );

        let response = self
            .client
            .create_launch_template()
            .launch_template_name(&spec.name)
            .launch_template_data(launch_template_data(spec))
            .tag_specifications(tags::ec2_tag_spec(
                ResourceType::LaunchTemplate,
                self.run_id(),
                &[],
            ))
            .send()
            .await
            .map_err(aws_sdk_ec2::Error::from)
            .context("Failed to create launch template")?;

        let template_id = response
            .launch_template()
            .and_then(|t| t.launch_template_id())
            .context("No launch template ID in response")?
            .to_string();

        info!(launch_template_id = %template_id, "Created launch template");
        Ok(template_id)
    }
}
