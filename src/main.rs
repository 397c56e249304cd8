//! simple-server-provision: boot one EC2 web server and back up its root volume
//!
//! Runs the whole flow once and exits non-zero on the first failure, leaving
//! anything already created in place.

use anyhow::Result;
use clap::Parser;
use simple_server_provision::aws::classify_anyhow_error;
use simple_server_provision::config::ProvisionConfig;
use simple_server_provision::defaults::KEY_FILE;
use simple_server_provision::provision;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "simple-server-provision")]
#[command(about = "Provision an EC2 web server and swap in a restored root volume")]
#[command(version)]
struct Args {
    /// AWS profile to use (overrides AWS_PROFILE env var)
    #[arg(long)]
    aws_profile: Option<String>,

    /// Where to write the new key pair's private key (must not exist)
    #[arg(long, default_value = KEY_FILE)]
    key_file: PathBuf,

    /// Output JSON file for the created resource ids
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl From<Args> for ProvisionConfig {
    fn from(args: Args) -> Self {
        let mut config = ProvisionConfig::default();
        config.aws.aws_profile = args.aws_profile;
        config.key_pair.key_file = args.key_file;
        config.output = args.output;
        config
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if let Some(suggestion) = classify_anyhow_error(e).suggestion() {
        let _ = writeln!(stderr, "\n\x1b[36mHint:\x1b[0m {suggestion}");
    }

    if std::env::var("RUST_BACKTRACE").is_err() {
        let _ = writeln!(
            stderr,
            "\n\x1b[2mSet RUST_BACKTRACE=1 for a detailed backtrace\x1b[0m"
        );
    } else {
        let backtrace = e.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            let _ = writeln!(stderr, "\n\x1b[2mBacktrace:\x1b[0m\n{backtrace}");
        }
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    // Keep the AWS SDK to warnings unless RUST_LOG says otherwise
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
                .add_directive("aws_config=warn".parse()?)
                .add_directive("aws_sdk_ec2=warn".parse()?)
                .add_directive("aws_smithy_runtime=warn".parse()?),
        )
        .init();

    if let Some(profile) = &args.aws_profile {
        info!(profile = %profile, "Using AWS profile");
    }

    let config: ProvisionConfig = args.into();
    let resources = provision::run_provision(config).await?;

    println!("\nProvisioning complete\n");
    print!("{resources}");
    if let Some(ip) = &resources.public_ip_after_restore {
        println!("\nServer: http://{ip}/");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_fixed_setup() {
        let args = Args::parse_from(["simple-server-provision"]);
        let config: ProvisionConfig = args.into();

        assert_eq!(config.aws.region, "us-east-1");
        assert!(config.aws.aws_profile.is_none());
        assert_eq!(config.key_pair.key_file, PathBuf::from("bkeys.pem"));
        assert!(config.output.is_none());
    }

    #[test]
    fn flags_override_profile_and_paths() {
        let args = Args::parse_from([
            "simple-server-provision",
            "--aws-profile",
            "sandbox",
            "--key-file",
            "/tmp/k.pem",
            "-o",
            "out.json",
        ]);
        let config: ProvisionConfig = args.into();

        assert_eq!(config.aws.region, "us-east-1");
        assert_eq!(config.aws.aws_profile.as_deref(), Some("sandbox"));
        assert_eq!(config.key_pair.key_file, PathBuf::from("/tmp/k.pem"));
        assert_eq!(config.output, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn region_is_not_configurable() {
        let result = Args::try_parse_from(["simple-server-provision", "--region", "eu-west-1"]);
        assert!(result.is_err());
    }
}
