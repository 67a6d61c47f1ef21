// Config Domain Layer
//
// 配置领域层：实体与值对象

mod entities;
mod value_objects;

pub use entities::*;
pub use value_objects::*;
