use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque stable identifier for one end user of the chat transport.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Durable per-user session row. `dialogue_state` is the persisted state
/// label; `None` means the user is idle with no active dialogue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub user_id: UserId,
    pub dialogue_state: Option<String>,
    pub last_seen_at: DateTime<Utc>,
}

impl UserSession {
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self { user_id, dialogue_state: None, last_seen_at: now }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{UserId, UserSession};

    #[test]
    fn fresh_session_starts_idle() {
        let session = UserSession::new(UserId("U100".to_owned()), Utc::now());
        assert_eq!(session.dialogue_state, None);
        assert_eq!(session.user_id.as_str(), "U100");
    }
}
