//! 灯箱生命周期错误。
//!
//! 缺失数据与迟到回调都不是错误（见 `binder` 的空引擎检查），
//! 这里只收纳真正需要宿主处理的失败。

#[derive(Debug, thiserror::Error)]
pub enum LightboxError {
    /// 呈现引擎构造失败。
    #[error("引擎构造失败：{0}")]
    EngineConstruction(String),

    /// 呈现引擎初始化失败。
    #[error("引擎初始化失败：{0}")]
    EngineInit(String),

    #[error("灯箱会话不存在：{0}")]
    SessionNotFound(String),

    #[error("运行时不可用：{0}")]
    Runtime(String),

    #[error("设置无效：{0}")]
    InvalidSettings(String),

    #[error("状态锁已中毒：{0}")]
    Poisoned(String),
}
