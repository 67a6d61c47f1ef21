// Chat Ports Layer
// 端口定义了模块与外部世界的接口

mod llm_port;
mod output_port;
mod thread_repository;

pub use llm_port::*;
pub use output_port::*;
pub use thread_repository::*;
