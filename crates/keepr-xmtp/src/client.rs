// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the XMTP sidecar gateway.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use keepr_core::types::GroupMember;
use keepr_core::{GroupClient, KeeprError, MessagingErrorKind};

/// Group client over the XMTP gateway's HTTP surface.
///
/// The gateway owns the XMTP identity and conversation state; this client
/// only issues requests and classifies failures. Removing a non-member is
/// a no-op on the gateway side, which the engine's removal path relies on.
#[derive(Debug, Clone)]
pub struct XmtpGatewayClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MembersResponse {
    members: Vec<MemberEntry>,
}

#[derive(Debug, Deserialize)]
struct MemberEntry {
    member_id: String,
    #[serde(default)]
    wallet_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdentityResponse {
    member_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct MemberIdsBody<'a> {
    member_ids: &'a [String],
}

#[derive(Debug, Serialize)]
struct PoliciesBody<'a> {
    owner_address: &'a str,
}

impl XmtpGatewayClient {
    pub fn new(
        api_url: &str,
        auth_token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, KeeprError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| KeeprError::Config(format!("invalid gateway auth token: {e}")))?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| KeeprError::Messaging {
                kind: MessagingErrorKind::Other,
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Checks the status and classifies a non-success into a messaging error.
    async fn check(
        response: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response, KeeprError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let detail = if body.is_empty() {
            String::new()
        } else {
            format!(": {}", body.chars().take(200).collect::<String>())
        };
        Err(KeeprError::messaging(
            classify_status(status),
            format!("{context} returned {status}{detail}"),
        ))
    }
}

/// Map a gateway status code to the engine's failure classification.
fn classify_status(status: StatusCode) -> MessagingErrorKind {
    match status {
        StatusCode::NOT_FOUND => MessagingErrorKind::ConversationNotFound,
        StatusCode::TOO_MANY_REQUESTS => MessagingErrorKind::RateLimited,
        StatusCode::REQUEST_TIMEOUT => MessagingErrorKind::Timeout,
        StatusCode::BAD_REQUEST => MessagingErrorKind::InvalidRequest,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => MessagingErrorKind::PermissionDenied,
        s if s.is_server_error() => MessagingErrorKind::Transport,
        _ => MessagingErrorKind::Other,
    }
}

/// Map a transport-level reqwest failure.
fn classify_transport(e: reqwest::Error, context: &str) -> KeeprError {
    let kind = if e.is_timeout() {
        MessagingErrorKind::Timeout
    } else if e.is_connect() {
        MessagingErrorKind::Transport
    } else {
        MessagingErrorKind::Other
    };
    KeeprError::Messaging {
        kind,
        message: format!("{context} failed: {e}"),
        source: Some(Box::new(e)),
    }
}

#[async_trait]
impl GroupClient for XmtpGatewayClient {
    async fn conversation_exists(&self, group_id: &str) -> Result<bool, KeeprError> {
        let response = self
            .client
            .get(self.url(&format!("/conversations/{group_id}")))
            .send()
            .await
            .map_err(|e| classify_transport(e, "conversation lookup"))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Self::check(response, "conversation lookup").await?;
        Ok(true)
    }

    async fn list_members(&self, group_id: &str) -> Result<Vec<GroupMember>, KeeprError> {
        let response = self
            .client
            .get(self.url(&format!("/conversations/{group_id}/members")))
            .send()
            .await
            .map_err(|e| classify_transport(e, "member listing"))?;
        let response = Self::check(response, "member listing").await?;
        let parsed: MembersResponse = response.json().await.map_err(|e| KeeprError::Messaging {
            kind: MessagingErrorKind::Transport,
            message: format!("malformed member listing: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(parsed
            .members
            .into_iter()
            .map(|m| GroupMember {
                member_id: m.member_id,
                wallet_address: m.wallet_address,
            })
            .collect())
    }

    async fn add_members(&self, group_id: &str, member_ids: &[String]) -> Result<(), KeeprError> {
        debug!(group_id, count = member_ids.len(), "adding members");
        let response = self
            .client
            .post(self.url(&format!("/conversations/{group_id}/members")))
            .json(&MemberIdsBody { member_ids })
            .send()
            .await
            .map_err(|e| classify_transport(e, "member add"))?;
        Self::check(response, "member add").await?;
        Ok(())
    }

    async fn remove_members(
        &self,
        group_id: &str,
        member_ids: &[String],
    ) -> Result<(), KeeprError> {
        debug!(group_id, count = member_ids.len(), "removing members");
        let response = self
            .client
            .post(self.url(&format!("/conversations/{group_id}/members/remove")))
            .json(&MemberIdsBody { member_ids })
            .send()
            .await
            .map_err(|e| classify_transport(e, "member removal"))?;
        Self::check(response, "member removal").await?;
        Ok(())
    }

    async fn resolve_member_id(&self, wallet_address: &str) -> Result<Option<String>, KeeprError> {
        let response = self
            .client
            .get(self.url(&format!("/identities/{wallet_address}")))
            .send()
            .await
            .map_err(|e| classify_transport(e, "identity resolution"))?;
        // An unregistered wallet is a precondition failure for the caller,
        // never an error here.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::check(response, "identity resolution").await?;
        let parsed: IdentityResponse =
            response.json().await.map_err(|e| KeeprError::Messaging {
                kind: MessagingErrorKind::Transport,
                message: format!("malformed identity response: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(parsed.member_id)
    }

    async fn sync_conversation(&self, group_id: &str) -> Result<(), KeeprError> {
        let response = self
            .client
            .post(self.url(&format!("/conversations/{group_id}/sync")))
            .send()
            .await
            .map_err(|e| classify_transport(e, "conversation sync"))?;
        Self::check(response, "conversation sync").await?;
        Ok(())
    }

    async fn enforce_admin_policies(
        &self,
        group_id: &str,
        owner_address: &str,
    ) -> Result<(), KeeprError> {
        let response = self
            .client
            .post(self.url(&format!("/conversations/{group_id}/policies")))
            .json(&PoliciesBody { owner_address })
            .send()
            .await
            .map_err(|e| classify_transport(e, "policy enforcement"))?;
        Self::check(response, "policy enforcement").await?;
        Ok(())
    }
}
