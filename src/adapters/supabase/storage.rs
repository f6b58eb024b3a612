//! Object storage over `/storage/v1/object`.

use super::client::{self, SupabaseClient};
use crate::domain::DomainError;
use crate::ports::StoragePort;
use async_trait::async_trait;
use reqwest::Method;
use std::sync::Arc;

pub struct SupabaseStorage {
    client: Arc<SupabaseClient>,
}

impl SupabaseStorage {
    pub fn new(client: Arc<SupabaseClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StoragePort for SupabaseStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<(), DomainError> {
        let req = self
            .client
            .request(Method::POST, &format!("/storage/v1/object/{}/{}", bucket, path))
            .header("Content-Type", content_type)
            .header("Cache-Control", "max-age=3600")
            .header("x-upsert", "false")
            .body(bytes.to_vec());
        client::send(req, DomainError::Storage).await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.client
            .url(&format!("/storage/v1/object/public/{}/{}", bucket, path))
    }
}
