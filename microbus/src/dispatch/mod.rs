//! 异步派发子系统（dispatch）
//!
//! 提供单工作线程的事件循环，把触发推迟到专用线程上执行：
//! - `EventLoop`：FIFO 队列 + 专用工作线程，`enqueue` 投递，`stop` 关闭；
//! - `EventLoopConfig`：工作线程名、栈大小等启动参数；
//! - 完成屏障：按「已投递但尚未执行完」的任务数阻塞等待。
//!
//! 单个循环内的任务严格串行；不同循环、以及其它线程上的同步 `trigger` 之间可以并行。
//!
mod barrier;
pub mod config;
pub mod event_loop;

pub use config::EventLoopConfig;
pub use event_loop::EventLoop;
