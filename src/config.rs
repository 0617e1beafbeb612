use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 跨域白名单 (ALLOWED_ORIGINS, 逗号分隔)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

/// 会话配置: 认证数据目录 + 桥接进程 + 重连策略
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub auth_path: PathBuf,
    pub bridge: BridgeConfig,
    pub reconnect: ReconnectPolicy,
}

/// 桥接进程 (托管浏览器自动化消息库的 sidecar)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub command: String,
    pub script: PathBuf,
    pub port: u16,
}

/// 断线重连策略 - 指数退避, 有最大次数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    pub enabled: bool,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl ReconnectPolicy {
    /// 不自动重连 (断线后需人工重启)
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// 第 attempt 次重连前的等待时间 (attempt 从 1 开始)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 5,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 按给定的查找函数加载配置, 缺失或无法解析的值使用默认值
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ReconnectPolicy::default();
        let secs = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        Self {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: lookup("PORT")
                    .and_then(|p| p.trim().parse().ok())
                    .unwrap_or(3000),
            },
            cors: CorsConfig {
                allowed_origins: lookup("ALLOWED_ORIGINS")
                    .map(|raw| parse_origins(&raw))
                    .unwrap_or_default(),
            },
            session: SessionConfig {
                auth_path: lookup("AUTH_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./wwebjs_auth")),
                bridge: BridgeConfig {
                    command: lookup("BRIDGE_COMMAND").unwrap_or_else(|| "node".to_string()),
                    script: lookup("BRIDGE_SCRIPT")
                        .map(PathBuf::from)
                        .unwrap_or_else(|| PathBuf::from("./bridge/index.js")),
                    port: lookup("BRIDGE_PORT")
                        .and_then(|p| p.trim().parse().ok())
                        .unwrap_or(3100),
                },
                reconnect: ReconnectPolicy {
                    enabled: lookup("RECONNECT_ENABLED")
                        .and_then(|v| parse_bool(&v))
                        .unwrap_or(defaults.enabled),
                    max_attempts: lookup("RECONNECT_MAX_ATTEMPTS")
                        .and_then(|v| v.trim().parse().ok())
                        .unwrap_or(defaults.max_attempts),
                    initial_backoff: secs(
                        "RECONNECT_INITIAL_BACKOFF_SECS",
                        defaults.initial_backoff,
                    ),
                    max_backoff: secs("RECONNECT_MAX_BACKOFF_SECS", defaults.max_backoff),
                },
            },
        }
    }
}

/// 解析逗号分隔的来源列表
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert!(config.cors.allowed_origins.is_empty());
        assert_eq!(config.session.auth_path, PathBuf::from("./wwebjs_auth"));
        assert_eq!(config.session.bridge.command, "node");
        assert_eq!(config.session.bridge.port, 3100);
        assert_eq!(config.session.reconnect, ReconnectPolicy::default());
    }

    #[test]
    fn reads_values_from_lookup() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("PORT", "8081"),
            ("ALLOWED_ORIGINS", " https://a.example , https://b.example,,"),
            ("AUTH_PATH", "/var/lib/relay"),
            ("BRIDGE_PORT", "4000"),
            ("RECONNECT_ENABLED", "off"),
            ("RECONNECT_MAX_ATTEMPTS", "9"),
            ("RECONNECT_INITIAL_BACKOFF_SECS", "1"),
        ]));

        assert_eq!(config.server.port, 8081);
        assert_eq!(
            config.cors.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(config.session.auth_path, PathBuf::from("/var/lib/relay"));
        assert_eq!(config.session.bridge.port, 4000);
        assert!(!config.session.reconnect.enabled);
        assert_eq!(config.session.reconnect.max_attempts, 9);
        assert_eq!(config.session.reconnect.initial_backoff, Duration::from_secs(1));
        assert_eq!(config.session.reconnect.max_backoff, Duration::from_secs(60));
    }

    #[test]
    fn unparseable_values_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("PORT", "http"),
            ("RECONNECT_ENABLED", "maybe"),
            ("RECONNECT_MAX_ATTEMPTS", "-1"),
        ]));
        assert_eq!(config.server.port, 3000);
        assert!(config.session.reconnect.enabled);
        assert_eq!(config.session.reconnect.max_attempts, 5);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = ReconnectPolicy {
            enabled: true,
            max_attempts: 10,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(20),
        };
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
        assert_eq!(policy.backoff(3), Duration::from_secs(8));
        assert_eq!(policy.backoff(4), Duration::from_secs(16));
        assert_eq!(policy.backoff(5), Duration::from_secs(20));
        assert_eq!(policy.backoff(64), Duration::from_secs(20));
    }
}
