//! AWS resource tags
//!
//! Resources created by a run carry these tags so leftovers can be found
//! in the console after a failed run.
//!
//! | Tag Key | Description |
//! |---------|-------------|
//! | `simple-server:tool` | Static identifier ("simple-server-provision") |
//! | `simple-server:run-id` | Unique run identifier (UUID v7) |
//! | `simple-server:created-at` | RFC 3339 creation timestamp |

use aws_sdk_ec2::types::{ResourceType, Tag, TagSpecification};

/// Tag key for tool identification
pub const TAG_TOOL: &str = "simple-server:tool";

/// Tag value for tool identification
pub const TAG_TOOL_VALUE: &str = "simple-server-provision";

/// Tag key for the run ID
pub const TAG_RUN_ID: &str = "simple-server:run-id";

/// Tag key for creation timestamp (RFC 3339 format)
pub const TAG_CREATED_AT: &str = "simple-server:created-at";

/// The `Name` tag shown in the EC2 console
pub const TAG_NAME: &str = "Name";

pub fn format_created_at(time: chrono::DateTime<chrono::Utc>) -> String {
    time.to_rfc3339()
}

/// Build an EC2 TagSpecification with the run tags plus optional extra tags.
pub fn ec2_tag_spec(
    resource_type: ResourceType,
    run_id: &str,
    extra_tags: &[(&str, &str)],
) -> TagSpecification {
    let created_at = format_created_at(chrono::Utc::now());
    let mut builder = TagSpecification::builder()
        .resource_type(resource_type)
        .tags(Tag::builder().key(TAG_TOOL).value(TAG_TOOL_VALUE).build())
        .tags(Tag::builder().key(TAG_RUN_ID).value(run_id).build())
        .tags(
            Tag::builder()
                .key(TAG_CREATED_AT)
                .value(&created_at)
                .build(),
        );
    for (k, v) in extra_tags {
        builder = builder.tags(Tag::builder().key(*k).value(*v).build());
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag_value<'a>(spec: &'a TagSpecification, key: &str) -> Option<&'a str> {
        spec.tags()
            .iter()
            .find(|t| t.key() == Some(key))
            .and_then(|t| t.value())
    }

    #[test]
    fn tag_spec_carries_run_tags_and_extras() {
        let spec = ec2_tag_spec(
            ResourceType::Snapshot,
            "run-123",
            &[(TAG_NAME, "SimpleAwsWebsite-backup")],
        );

        assert_eq!(spec.resource_type(), Some(&ResourceType::Snapshot));
        assert_eq!(tag_value(&spec, TAG_TOOL), Some(TAG_TOOL_VALUE));
        assert_eq!(tag_value(&spec, TAG_RUN_ID), Some("run-123"));
        assert_eq!(tag_value(&spec, TAG_NAME), Some("SimpleAwsWebsite-backup"));

        let created_at = tag_value(&spec, TAG_CREATED_AT).expect("created-at tag");
        assert!(chrono::DateTime::parse_from_rfc3339(created_at).is_ok());
    }
}
