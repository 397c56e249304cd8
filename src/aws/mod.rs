//! AWS service clients

pub mod context;
pub mod ec2;
pub mod error;
pub mod tags;

pub use context::AwsContext;
pub use ec2::{Ec2Client, Ec2Operations};
pub use error::{AwsError, classify_anyhow_error, classify_aws_error};
