//! Literal provisioning parameters
//!
//! Everything the server is built from lives here: region, image, names,
//! ingress rules and the boot script. The CLI only picks credentials and
//! output locations.

use std::time::Duration;

/// AWS region resources are created in
pub const DEFAULT_REGION: &str = "us-east-1";

/// Amazon Linux 2 AMI in us-east-1
pub const IMAGE_ID: &str = "ami-0c94855ba95c71c99";

/// Instance type for the web server
pub const INSTANCE_TYPE: &str = "t2.micro";

pub const SECURITY_GROUP_NAME: &str = "SimpleHTTPService";
pub const SECURITY_GROUP_DESCRIPTION: &str = "Security groupto allow traffic of the type HTTP!";

/// CIDR every ingress rule is opened to
pub const INGRESS_CIDR: &str = "0.0.0.0/0";

/// Ingress rules as (port, description), all TCP
pub const INGRESS_PORTS: &[(i32, &str)] = &[
    (443, "Allow HTTPS"),
    (80, "Allow HTTP"),
    (22, "Allow SSH"),
];

pub const KEY_PAIR_NAME: &str = "bkeys";

/// Where the private key returned by CreateKeyPair is written
pub const KEY_FILE: &str = "bkeys.pem";

pub const LAUNCH_TEMPLATE_NAME: &str = "OurSimpleServer";

/// Value of the `Name` tag applied to the instance by the launch template
pub const INSTANCE_NAME_TAG: &str = "SimpleAwsWebsite";

/// Port probed to decide the web server is reachable
pub const HTTP_PORT: u16 = 80;

/// Boot script installing and enabling Apache httpd (sent base64-encoded)
pub const USER_DATA: &str = "#!/bin/bash\n\
sudo su\n\
yum update -y\n\
yum upgrade -y\n\
yum install httpd -y\n\
systemctl start httpd\n\
systemctl enable httpd\n\
chown ec2-user /var/www/*\n\
chown ec2-user /var/www";

/// Timeout for an instance to reach `running` or `stopped` (10 minutes)
pub const INSTANCE_WAIT_TIMEOUT: Duration = Duration::from_secs(600);

/// Timeout for a snapshot to complete (30 minutes)
pub const SNAPSHOT_WAIT_TIMEOUT: Duration = Duration::from_secs(1800);

/// Timeout for a volume to become `available` or `in-use` (10 minutes)
pub const VOLUME_WAIT_TIMEOUT: Duration = Duration::from_secs(600);

/// Timeout for the web server port to accept connections (10 minutes)
pub const REACHABILITY_TIMEOUT: Duration = Duration::from_secs(600);
