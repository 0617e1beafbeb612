use serde::Serialize;

/// 会话生命周期状态; 配对二维码只存在于 AwaitingScan 中
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    AwaitingScan { qr_data_url: String },
    Authenticated,
    Ready,
    Disconnected,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::AwaitingScan { .. } => "awaiting_scan",
            Self::Authenticated => "authenticated",
            Self::Ready => "ready",
            Self::Disconnected => "disconnected",
        }
    }

    pub fn pairing_artifact(&self) -> Option<&str> {
        match self {
            Self::AwaitingScan { qr_data_url } => Some(qr_data_url),
            _ => None,
        }
    }
}

/// /status 返回的粗粒度连接状态, 只有 Ready 视为已连接
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

impl From<&SessionState> for ConnectionStatus {
    fn from(state: &SessionState) -> Self {
        match state {
            SessionState::Ready => Self::Connected,
            _ => Self::Disconnected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_ready_counts_as_connected() {
        let states = [
            SessionState::Unauthenticated,
            SessionState::AwaitingScan {
                qr_data_url: "data:image/png;base64,AA==".to_string(),
            },
            SessionState::Authenticated,
            SessionState::Disconnected,
        ];
        for state in &states {
            assert_eq!(ConnectionStatus::from(state), ConnectionStatus::Disconnected);
        }
        assert_eq!(
            ConnectionStatus::from(&SessionState::Ready),
            ConnectionStatus::Connected
        );
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ConnectionStatus::Connected).unwrap(),
            "\"connected\""
        );
    }
}
