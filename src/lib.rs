//! codepad - 持久化工作区存储、标签会话与跨文件搜索
//!
//! 模块结构：
//! - models: 数据模型（文件 / 文件夹记录、路径解析、命名）
//! - kernel::storage: 持久化存储（PersistentStore）
//! - kernel::workspace: 标签页会话与自动保存（WorkspaceManager）
//! - kernel::search: 跨文件搜索与替换（SearchEngine）
//! - kernel::services: ports（契约）+ adapters（引擎、设置、运行时）

pub mod kernel;
pub mod logging;
pub mod models;
