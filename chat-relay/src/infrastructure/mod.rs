// Infrastructure - 进程级共享设施

mod event_bus;
mod state;

pub use event_bus::*;
pub use state::*;
