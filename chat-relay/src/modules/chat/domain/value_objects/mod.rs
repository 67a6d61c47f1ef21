// Chat Domain - Value Objects
// 值对象是不可变的，通过值而非标识来比较

mod chat_settings;
mod step_id;
mod thread_id;

pub use chat_settings::*;
pub use step_id::*;
pub use thread_id::*;
