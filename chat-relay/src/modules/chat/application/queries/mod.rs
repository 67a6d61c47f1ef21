// Chat Queries - 查询定义和处理器

mod get_thread;
mod get_thread_author;
mod get_user;
mod list_threads;

pub use get_thread::*;
pub use get_thread_author::*;
pub use get_user::*;
pub use list_threads::*;
