// Chat Domain - Entities
// 实体通过唯一标识符来识别

mod history;
mod step;
mod thread;
mod user;

pub use history::*;
pub use step::*;
pub use thread::*;
pub use user::*;
