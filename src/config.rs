//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SCOUT__*` 覆盖（双下划线表示
//! 嵌套，如 `SCOUT__LLM__REQUEST_TIMEOUT_SECS=30`）。API Key 也可以直接用
//! 各厂商的惯用环境变量（`GOOGLE_GEMINI_API_KEY` / `GROQ_API_KEY` /
//! `COHERE_API_KEY`），适配器在构造时兜底读取。

use serde::Deserialize;
use std::path::PathBuf;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub assistant: AssistantSection,
}

/// [llm] 段：后端优先级顺序、单次请求超时、各后端的模型与 Key
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 回退链顺序，按序尝试直到首个成功
    #[serde(default = "default_providers")]
    pub providers: Vec<String>,
    /// 网关对每个后端强加的超时（秒）；后端自身挂起时保证能继续回退
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub gemini: ProviderSection,
    #[serde(default)]
    pub groq: ProviderSection,
    #[serde(default)]
    pub cohere: ProviderSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            providers: default_providers(),
            request_timeout_secs: default_request_timeout(),
            gemini: ProviderSection::default(),
            groq: ProviderSection::default(),
            cohere: ProviderSection::default(),
        }
    }
}

fn default_providers() -> Vec<String> {
    vec!["gemini".into(), "groq".into(), "cohere".into()]
}

fn default_request_timeout() -> u64 {
    60
}

/// 单个后端的配置；api_key 缺省时适配器回落到对应环境变量
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProviderSection {
    pub model: Option<String>,
    pub api_key: Option<String>,
}

/// [store] 段：SQLite 数据库路径
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSection {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("scout.db")
}

/// [assistant] 段：删除消解时向前查询日程的天数窗口
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantSection {
    #[serde(default = "default_lookahead_days")]
    pub lookahead_days: i64,
}

impl Default for AssistantSection {
    fn default() -> Self {
        Self {
            lookahead_days: default_lookahead_days(),
        }
    }
}

fn default_lookahead_days() -> i64 {
    7
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmSection::default(),
            store: StoreSection::default(),
            assistant: AssistantSection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 SCOUT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 SCOUT__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SCOUT")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
