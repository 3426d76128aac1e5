//! Presence and broadcast DTOs.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::UserId;
use crate::hub::MemberInfo;

/// One online user, aggregated over their connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct OnlineUserDto {
    /// User identifier.
    pub user_id: String,
    /// Number of live connections (tabs, devices).
    pub connections: usize,
    /// Registration time of the oldest live connection.
    pub online_since: DateTime<Utc>,
}

/// Response body for `GET /presence`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PresenceListResponse {
    /// Online users, ordered by their oldest live connection.
    pub data: Vec<OnlineUserDto>,
    /// Total live connections across all users.
    pub total_connections: usize,
}

impl PresenceListResponse {
    /// Groups a registry snapshot (in registration order) by user.
    #[must_use]
    pub fn from_members(members: Vec<MemberInfo>) -> Self {
        let total_connections = members.len();
        let mut data: Vec<OnlineUserDto> = Vec::new();
        let mut index: HashMap<UserId, usize> = HashMap::new();
        for member in members {
            match index.get(&member.user).and_then(|&i| data.get_mut(i)) {
                Some(user) => {
                    user.connections += 1;
                    user.online_since = user.online_since.min(member.connected_at);
                }
                None => {
                    index.insert(member.user.clone(), data.len());
                    data.push(OnlineUserDto {
                        user_id: member.user.to_string(),
                        connections: 1,
                        online_since: member.connected_at,
                    });
                }
            }
        }
        Self {
            data,
            total_connections,
        }
    }
}

/// Request body for `POST /broadcast`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BroadcastRequest {
    /// Chat payload delivered as the `content` of a `message` frame.
    pub content: String,
}
