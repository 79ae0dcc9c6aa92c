//! Content-addressed blob storage: uploads through a node's `/api/v0/add`
//! RPC, downloads through a plain gateway. The store is never trusted to
//! authenticate content; callers re-hash against the on-chain root.

use cid::Cid;
use failure::Error;
use std::convert::TryFrom;
use url::Url;

use crate::distribution::DistributionBlob;
use crate::error::DistributorError;

pub struct IpfsStore {
    api: Url,
    gateway: Url,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

/// Syntactic CID check only; says nothing about availability or content.
pub fn validate_cid(raw: &str) -> bool {
    Cid::try_from(raw).is_ok()
}

impl IpfsStore {
    pub fn new(api_url: &str, gateway_url: &str) -> Result<Self, Error> {
        Ok(Self {
            api: Url::parse(api_url)?,
            gateway: Url::parse(gateway_url)?,
            client: reqwest::Client::new(),
        })
    }

    /// Upload one round's blob, JSON-encoded with two-space indentation and
    /// stable key order, and return its CID.
    pub async fn put(&self, blob: &DistributionBlob) -> Result<String, Error> {
        let body = serde_json::to_vec_pretty(blob)?;
        let part = reqwest::multipart::Part::bytes(body).file_name("distribution.json");
        let form = reqwest::multipart::Form::new().part("file", part);

        let mut url = self.api.join("api/v0/add")?;
        url.query_pairs_mut().append_pair("cid-version", "1");

        let response = self.client.post(url).multipart(form).send().await?;
        if !response.status().is_success() {
            return Err(DistributorError::BlobStore(format!(
                "upload rejected with status {}",
                response.status()
            ))
            .into());
        }
        let parsed: AddResponse = response.json().await?;
        info!("uploaded distribution blob as {}", parsed.hash);
        Ok(parsed.hash)
    }

    /// Fetch and JSON-decode the blob behind `cid`.
    pub async fn get(&self, cid: &str) -> Result<DistributionBlob, Error> {
        if !validate_cid(cid) {
            return Err(
                DistributorError::ValidationFailure(format!("\"{}\" is not a valid CID", cid))
                    .into(),
            );
        }

        let url = self.gateway.join(&format!("ipfs/{}", cid))?;
        debug!("fetching distribution blob from {}", url);
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(DistributorError::BlobStore(format!(
                "download of {} failed with status {}",
                cid,
                response.status()
            ))
            .into());
        }
        let blob: DistributionBlob = response.json().await?;
        Ok(blob)
    }

    pub fn gateway(&self) -> &Url {
        &self.gateway
    }
}
