//! Proxmox VE API client
//!
//! The guard needs one read (`status/current`) and one write (`config`)
//! per VM. Both sit behind [`ResourceApi`] so the run loop can be driven
//! against a fake in tests.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::config::ProxmoxConfig;
use crate::error::ClientError;
use crate::models::VmStatus;

/// Read and reconfigure operations for a single VM
#[async_trait]
pub trait ResourceApi: Send + Sync {
    /// Fetch and parse `status/current` once
    async fn status(&self, vm_id: u32) -> Result<VmStatus, ClientError>;

    /// Apply a new memory allocation in MB
    async fn set_memory(&self, vm_id: u32, memory_mb: u64) -> Result<(), ClientError>;
}

#[async_trait]
impl<'a, T: ResourceApi + ?Sized> ResourceApi for &'a T {
    async fn status(&self, vm_id: u32) -> Result<VmStatus, ClientError> {
        (**self).status(vm_id).await
    }

    async fn set_memory(&self, vm_id: u32, memory_mb: u64) -> Result<(), ClientError> {
        (**self).set_memory(vm_id, memory_mb).await
    }
}

/// Every Proxmox response wraps its payload in `data`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

/// API-token authenticated client for one node
pub struct ProxmoxClient {
    client: Client,
    base_url: Url,
    node: String,
    auth: String,
}

impl ProxmoxClient {
    pub fn new(config: &ProxmoxConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()?;

        let base_url = Url::parse(&format!("{}/api2/json/", config.host))?;

        Ok(Self {
            client,
            base_url,
            node: config.node.clone(),
            auth: config.auth_header(),
        })
    }

    fn vm_url(&self, vm_id: u32, endpoint: &str) -> Result<Url, ClientError> {
        let path = format!("nodes/{}/qemu/{}/{}", self.node, vm_id, endpoint);
        Ok(self.base_url.join(&path)?)
    }
}

#[async_trait]
impl ResourceApi for ProxmoxClient {
    async fn status(&self, vm_id: u32) -> Result<VmStatus, ClientError> {
        let url = self.vm_url(vm_id, "status/current")?;
        debug!(vm_id, %url, "Fetching VM status");

        let response = self
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, &self.auth)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status { status, body });
        }

        let envelope: Envelope<VmStatus> = serde_json::from_str(&body)?;
        Ok(envelope.data.unwrap_or_default())
    }

    async fn set_memory(&self, vm_id: u32, memory_mb: u64) -> Result<(), ClientError> {
        let url = self.vm_url(vm_id, "config")?;
        debug!(vm_id, memory_mb, %url, "Updating VM memory");

        let response = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, &self.auth)
            .form(&[("memory", memory_mb.to_string())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if has_errors(&body) {
            return Err(ClientError::Rejected { body });
        }
        if !status.is_success() {
            return Err(ClientError::Status { status, body });
        }
        Ok(())
    }
}

/// True when the body carries an `errors` marker
fn has_errors(body: &str) -> bool {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => value.get("errors").is_some_and(|errors| !errors.is_null()),
        Err(_) => body.contains("\"errors\""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_errors() {
        assert!(has_errors(r#"{"errors":{"memory":"value too small"},"data":null}"#));
        assert!(!has_errors(r#"{"data":null}"#));
        assert!(!has_errors(r#"{"data":"UPID:pve1:0001","errors":null}"#));
        assert!(has_errors(r#"<html>"errors": oops"#));
        assert!(!has_errors(""));
    }

    #[test]
    fn test_envelope_with_null_data() {
        let envelope: Envelope<VmStatus> = serde_json::from_str(r#"{"data":null}"#).unwrap();
        assert!(envelope.data.is_none());
    }
}
