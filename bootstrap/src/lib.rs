//! agora-bootstrap - 服务启动骨架
//!
//! 运行时初始化与优雅关闭

mod runtime;
mod shutdown;

pub use runtime::*;
pub use shutdown::*;
