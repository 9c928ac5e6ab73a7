//! Schema 注册表 / 版本台账
//!
//! 声明当前构建的 schema 版本号、全部对象仓库（store）及其主键策略，
//! 以及已退役仓库到后继仓库的字段映射表。本模块只有声明式数据，
//! 仅被迁移引擎消费；新增一次 schema 演进只需要改这里的表，不需要新增控制流。

use serde_json::{json, Value};

/// 当前目标 schema 版本
///
/// 版本历史（只增不减，编号永不复用）：
/// - v1: sessions
/// - v2: + config
/// - v3: + assistants（内嵌 workflow 图，调用方提供整数主键）
/// - v4: + workflows，assistants 记录迁入 workflows 后删除旧仓库
/// - v5: + assistants（新形态，自增主键）
pub const DB_VERSION: u32 = 5;

/// 仓库主键策略
///
/// 调用方需要提前知道某个仓库是否由自己提供主键，因此主键策略
/// 是注册表声明的一部分，而不是统一规则。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// 调用方提供的整数主键（创建时间毫秒数）
    CallerInteger,
    /// 固定的常量字符串主键（单例记录）
    FixedText,
    /// 存储引擎生成的自增整数主键
    AutoIncrement,
}

impl KeyKind {
    /// 台账中的持久化标识
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::CallerInteger => "caller_integer",
            KeyKind::FixedText => "fixed_text",
            KeyKind::AutoIncrement => "auto_increment",
        }
    }

    /// 从台账标识还原；未知标识视为台账损坏
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "caller_integer" => Some(KeyKind::CallerInteger),
            "fixed_text" => Some(KeyKind::FixedText),
            "auto_increment" => Some(KeyKind::AutoIncrement),
            _ => None,
        }
    }
}

/// 一个对象仓库的声明
#[derive(Debug, Clone, Copy)]
pub struct StoreSpec {
    /// 仓库名（即表名）
    pub name: &'static str,
    /// 主键在记录 JSON 中的字段名
    pub key_path: &'static str,
    /// 主键策略
    pub key: KeyKind,
}

/// 会话仓库
pub const SESSIONS: StoreSpec = StoreSpec {
    name: "sessions",
    key_path: "id",
    key: KeyKind::CallerInteger,
};

/// 配置仓库（单例记录，固定主键）
pub const CONFIG: StoreSpec = StoreSpec {
    name: "config",
    key_path: "id",
    key: KeyKind::FixedText,
};

/// 工作流仓库
pub const WORKFLOWS: StoreSpec = StoreSpec {
    name: "workflows",
    key_path: "id",
    key: KeyKind::CallerInteger,
};

/// 助手仓库（当前形态，自增主键）
pub const ASSISTANTS: StoreSpec = StoreSpec {
    name: "assistants",
    key_path: "id",
    key: KeyKind::AutoIncrement,
};

/// 当前版本声明的全部仓库
pub const STORES: &[StoreSpec] = &[SESSIONS, CONFIG, WORKFLOWS, ASSISTANTS];

/// 按名字查找当前声明的仓库
pub fn store_spec(name: &str) -> Option<&'static StoreSpec> {
    STORES.iter().find(|s| s.name == name)
}

/// 退役仓库记录向后继仓库迁移时的单个字段映射
///
/// `from` 是源记录上的 JSON Pointer，`to` 是目标记录的字段名；
/// 源字段缺失或为 null 时用 `default` 的返回值代替。
pub struct FieldMapping {
    pub from: &'static str,
    pub to: &'static str,
    pub default: fn() -> Value,
}

/// 退役仓库的后继声明
pub struct SuccessorMapping {
    /// 接收记录的目标仓库，必须出现在 [`STORES`] 中
    pub to: &'static str,
    /// 逐字段映射表
    pub fields: &'static [FieldMapping],
}

/// 一个已退役的仓库形态
///
/// 仓库以（名字, 主键策略）为身份：名字被新形态复用时（v3 的
/// assistants 与 v5 的 assistants），旧形态照样按退役处理。
pub struct RetiredStore {
    pub name: &'static str,
    pub key: KeyKind,
    /// 为 None 时记录直接随仓库一起删除
    pub successor: Option<SuccessorMapping>,
}

fn default_null() -> Value {
    Value::Null
}

fn default_empty_string() -> Value {
    json!("")
}

fn default_zero() -> Value {
    json!(0)
}

fn default_false() -> Value {
    json!(false)
}

fn default_empty_array() -> Value {
    json!([])
}

/// v3 assistants（内嵌 workflow 图）→ workflows 的字段映射
const LEGACY_ASSISTANT_TO_WORKFLOW: &[FieldMapping] = &[
    FieldMapping {
        from: "/id",
        to: "id",
        default: default_null,
    },
    FieldMapping {
        from: "/name",
        to: "name",
        default: default_empty_string,
    },
    FieldMapping {
        from: "/createdTime",
        to: "createdTime",
        default: default_zero,
    },
    FieldMapping {
        from: "/deleted",
        to: "deleted",
        default: default_false,
    },
    FieldMapping {
        from: "/workflow/nodes",
        to: "nodes",
        default: default_empty_array,
    },
    FieldMapping {
        from: "/workflow/connections",
        to: "connections",
        default: default_empty_array,
    },
];

/// 全部退役仓库形态
pub const RETIRED: &[RetiredStore] = &[RetiredStore {
    name: "assistants",
    key: KeyKind::CallerInteger,
    successor: Some(SuccessorMapping {
        to: "workflows",
        fields: LEGACY_ASSISTANT_TO_WORKFLOW,
    }),
}];

/// 查找退役形态声明
pub fn retired_store(name: &str, key: KeyKind) -> Option<&'static RetiredStore> {
    RETIRED.iter().find(|r| r.name == name && r.key == key)
}

/// 按映射表把退役仓库的一条记录转换为后继仓库的记录
pub fn map_record(fields: &[FieldMapping], source: &Value) -> Value {
    let mut out = serde_json::Map::new();
    for field in fields {
        let value = match source.pointer(field.from) {
            Some(v) if !v.is_null() => v.clone(),
            _ => (field.default)(),
        };
        out.insert(field.to.to_string(), value);
    }
    Value::Object(out)
}
