//! agora-identity - 账户身份服务
//!
//! 分层结构：
//! - `domain`: 实体、值对象、仓储与通知端口
//! - `application`: 认证服务（注册、激活、登录、会话校验）
//! - `infrastructure`: 存储实现、通知发送队列、定期清理

pub mod application;
pub mod domain;
pub mod infrastructure;
