// Chat Commands - 命令定义和处理器

mod create_user;
mod delete_thread;
mod record_step;

pub use create_user::*;
pub use delete_thread::*;
pub use record_step::*;
