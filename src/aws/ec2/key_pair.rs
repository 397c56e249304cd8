//! Key pair creation and private key storage

use super::Ec2Client;
use super::types::CreatedKeyPair;
use crate::aws::tags;
use anyhow::{Context, Result};
use aws_sdk_ec2::types::{KeyFormat, KeyType, ResourceType};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

impl Ec2Client {
    /// Create an RSA key pair and return its private key in PEM form
    pub async fn create_key_pair(&self, key_name: &str) -> Result<CreatedKeyPair> {
        info!(key_name = %key_name, "Creating key pair");

        let response = self
            .client
            .create_key_pair()
            .key_name(key_name)
            .key_type(KeyType::Rsa)
            .key_format(KeyFormat::Pem)
            .tag_specifications(tags::ec2_tag_spec(
                ResourceType::KeyPair,
                self.run_id(),
                &[],
            ))
            .send()
            .await
            .map_err(aws_sdk_ec2::Error::from)
            .context("Failed to create key pair")?;

        let key_pair_id = response
            .key_pair_id()
            .context("No key pair ID in response")?
            .to_string();
        let key_material = response
            .key_material()
            .context("No key material in response")?
            .to_string();

        info!(key_pair_id = %key_pair_id, "Created key pair");

        Ok(CreatedKeyPair {
            key_pair_id,
            key_name: response.key_name().unwrap_or(key_name).to_string(),
            key_material,
        })
    }
}

/// Private key file, created empty (owner-only) before the key pair exists
/// so an unusable path is caught before anything is created in AWS.
#[derive(Debug)]
pub struct KeyFile {
    path: PathBuf,
    file: File,
}

impl KeyFile {
    /// Create `path` with mode 0600. Fails if it already exists.
    pub fn create(path: &Path) -> Result<Self> {
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let file = match options.open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => anyhow::bail!(
                "Key file {} already exists; move it away or pass --key-file",
                path.display()
            ),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to create key file {}", path.display()));
            }
        };

        debug!(path = %path.display(), "Created empty key file");
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the private key and close the file
    pub fn write(mut self, key_material: &str) -> Result<PathBuf> {
        self.file
            .write_all(key_material.as_bytes())
            .and_then(|()| self.file.sync_all())
            .with_context(|| format!("Failed to write key file {}", self.path.display()))?;

        info!(path = %self.path.display(), "Wrote private key");
        Ok(self.path)
    }

    /// Remove the still-empty file after a run that never got a key
    pub fn discard(self) {
        drop(self.file);
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Could not remove unused key file");
        }
    }
}
