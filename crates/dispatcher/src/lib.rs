//! 警情资源派遣同步引擎
//!
//! 轮询当前警情、维护派遣视图、执行派遣/召回命令并应用远程推送事件。

pub mod commands;
pub mod engine;
pub mod events;
pub mod loader;
pub mod poller;
pub mod projection;
pub mod store;
pub mod supervisor;

pub use commands::CommandHandler;
pub use engine::DispatchEngine;
pub use events::PushEventHandler;
pub use loader::ResourceViewLoader;
pub use poller::{OperationPoller, PollState, TickOutcome};
pub use store::{CommandTicket, DispatchStateStore, DispositionOutcome, ReplaceOutcome};
pub use supervisor::{Bindings, ConnectionSupervisor};
