//! Matrix room provider
//!
//! Rooms are created and renamed through the client-server API with the
//! service account's token. Joining users and deleting rooms goes through the
//! Synapse admin API, so the service account must be a server admin.

use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use roomsync_common::MatrixConfig;
use roomsync_core::{DomainError, ProviderId, ProviderResult, RoomId, RoomProvider, RoomSpec, UserId};

use super::error::{classify_status, classify_transport, MatrixErrorBody};

#[derive(Serialize)]
struct CreateRoomRequest<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    topic: Option<&'a str>,
    preset: &'static str,
    visibility: &'static str,
}

#[derive(Deserialize)]
struct CreateRoomResponse {
    room_id: String,
}

#[derive(Serialize)]
struct UserRequest<'a> {
    user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
}

/// Matrix homeserver adapter
pub struct MatrixRoomProvider {
    client: Client,
    homeserver: Url,
    access_token: String,
    server_name: String,
    user_prefix: String,
}

impl std::fmt::Debug for MatrixRoomProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatrixRoomProvider")
            .field("homeserver", &self.homeserver.as_str())
            .field("server_name", &self.server_name)
            .finish()
    }
}

impl MatrixRoomProvider {
    /// Build the adapter and its HTTP client
    pub fn new(config: &MatrixConfig) -> ProviderResult<Self> {
        let homeserver = Url::parse(&config.homeserver_url).map_err(|e| {
            DomainError::NotConfigured(format!("invalid Matrix homeserver url: {e}"))
        })?;

        if homeserver.cannot_be_a_base() {
            return Err(DomainError::NotConfigured(format!(
                "invalid Matrix homeserver url: {homeserver}"
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.timeout())
            .build()
            .map_err(|e| DomainError::NotConfigured(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            homeserver,
            access_token: config.access_token.clone(),
            server_name: config.server_name.clone(),
            user_prefix: config.user_prefix.clone(),
        })
    }

    /// Fully qualified Matrix id of a host user
    pub fn matrix_user_id(&self, user_id: UserId) -> String {
        format!("@{}{}:{}", self.user_prefix, user_id, self.server_name)
    }

    /// Homeserver URL with the given path segments appended (each one percent-encoded)
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.homeserver.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Issue an authenticated request; only transport failures are errors
    async fn call<B: Serialize + Sync>(
        &self,
        method: Method,
        url: Url,
        body: &B,
    ) -> ProviderResult<Response> {
        self.client
            .request(method, url)
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| classify_transport(&e))
    }

    /// Issue an authenticated request and require a success status
    async fn send<B: Serialize + Sync>(
        &self,
        method: Method,
        url: Url,
        body: &B,
    ) -> ProviderResult<Response> {
        let response = self.call(method, url, body).await?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }

    async fn put_state(&self, room_id: &RoomId, event_type: &str, content: serde_json::Value) -> ProviderResult<()> {
        let url = self.endpoint(&[
            "_matrix", "client", "v3", "rooms", room_id.as_str(), "state", event_type, "",
        ]);
        self.send(Method::PUT, url, &content).await?;
        Ok(())
    }

    async fn join(&self, room_id: &RoomId, user_id: UserId) -> ProviderResult<()> {
        let url = self.endpoint(&["_synapse", "admin", "v1", "join", room_id.as_str()]);
        let matrix_id = self.matrix_user_id(user_id);
        self.send(
            Method::POST,
            url,
            &UserRequest {
                user_id: &matrix_id,
                reason: None,
            },
        )
        .await?;
        Ok(())
    }

    async fn kick(&self, room_id: &RoomId, user_id: UserId) -> ProviderResult<()> {
        let url = self.endpoint(&["_matrix", "client", "v3", "rooms", room_id.as_str(), "kick"]);
        let matrix_id = self.matrix_user_id(user_id);

        let request = UserRequest {
            user_id: &matrix_id,
            reason: Some("Removed from course communication"),
        };
        let response = self.call(Method::POST, url, &request).await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::FORBIDDEN && MatrixErrorBody::parse(&body).is_not_in_room() {
            debug!(user_id = %user_id, "User already out of room");
            return Ok(());
        }
        Err(classify_status(status, &body))
    }

    /// Run one call per user, collecting the users that succeeded
    ///
    /// Rejected users are left out of the result. If every call failed
    /// transiently the whole batch is reported as unavailable.
    async fn per_user<F, Fut>(
        &self,
        action: &'static str,
        user_ids: &[UserId],
        call: F,
    ) -> ProviderResult<HashSet<UserId>>
    where
        F: Fn(UserId) -> Fut,
        Fut: std::future::Future<Output = ProviderResult<()>>,
    {
        let mut succeeded = HashSet::with_capacity(user_ids.len());
        let mut last_transient = None;
        let mut transient = 0usize;

        for &user_id in user_ids {
            match call(user_id).await {
                Ok(()) => {
                    succeeded.insert(user_id);
                }
                Err(e) if e.is_transient() => {
                    warn!(user_id = %user_id, action, error = %e, "Matrix call failed, will retry");
                    transient += 1;
                    last_transient = Some(e);
                }
                Err(e) => {
                    warn!(user_id = %user_id, action, error = %e, "Matrix rejected membership change");
                }
            }
        }

        if !user_ids.is_empty() && transient == user_ids.len() {
            if let Some(e) = last_transient {
                return Err(e);
            }
        }

        Ok(succeeded)
    }
}

#[async_trait]
impl RoomProvider for MatrixRoomProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Matrix
    }

    #[instrument(skip(self, spec), fields(context = %spec.context))]
    async fn create_room(&self, spec: &RoomSpec) -> ProviderResult<RoomId> {
        let url = self.endpoint(&["_matrix", "client", "v3", "createRoom"]);
        let request = CreateRoomRequest {
            name: &spec.name,
            topic: spec.topic.as_deref(),
            preset: "private_chat",
            visibility: "private",
        };

        let response = self.send(Method::POST, url, &request).await?;
        let created: CreateRoomResponse = response.json().await.map_err(|e| classify_transport(&e))?;

        info!(room_id = %created.room_id, name = %spec.name, "Matrix room created");
        Ok(RoomId::new(created.room_id))
    }

    #[instrument(skip(self, spec))]
    async fn update_room(&self, room_id: &RoomId, spec: &RoomSpec) -> ProviderResult<()> {
        self.put_state(room_id, "m.room.name", serde_json::json!({ "name": spec.name }))
            .await?;
        self.put_state(
            room_id,
            "m.room.topic",
            serde_json::json!({ "topic": spec.topic.as_deref().unwrap_or_default() }),
        )
        .await?;

        debug!(room_id = %room_id, "Matrix room updated");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_room(&self, room_id: &RoomId) -> ProviderResult<()> {
        let url = self.endpoint(&["_synapse", "admin", "v2", "rooms", room_id.as_str()]);

        let response = self
            .call(Method::DELETE, url, &serde_json::json!({ "purge": true }))
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(room_id = %room_id, "Matrix room already gone");
            return Ok(());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        info!(room_id = %room_id, "Matrix room deleted");
        Ok(())
    }

    #[instrument(skip(self, user_ids), fields(count = user_ids.len()))]
    async fn add_members(
        &self,
        room_id: &RoomId,
        user_ids: &[UserId],
    ) -> ProviderResult<HashSet<UserId>> {
        self.per_user("join", user_ids, |user_id| self.join(room_id, user_id))
            .await
    }

    #[instrument(skip(self, user_ids), fields(count = user_ids.len()))]
    async fn remove_members(
        &self,
        room_id: &RoomId,
        user_ids: &[UserId],
    ) -> ProviderResult<HashSet<UserId>> {
        self.per_user("kick", user_ids, |user_id| self.kick(room_id, user_id))
            .await
    }
}
