// Chat Infrastructure - Repositories
//
// 仓储实现：
// - InMemoryThreadRepository: 内存仓储，用于开发和测试
// - FileThreadRepository: 文件持久化仓储

mod file_thread_repository;
mod in_memory_thread_repository;

pub use file_thread_repository::*;
pub use in_memory_thread_repository::*;
