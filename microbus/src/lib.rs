//! 进程内事件总线（microbus）
//!
//! 提供按事件名发布/订阅的注册表，以及单工作线程的异步派发循环：
//! - 注册表（`event_bus`）：订阅、退订、同步触发与清空，读写锁纪律；
//! - 处理器（`handler`）：类型擦除的处理器单元与共享参数包；
//! - 异步派发（`dispatch`）：FIFO 队列、专用工作线程、完成屏障与停止信号；
//! - 共享上下文（`context`）：把一个注册表与一个事件循环绑定使用。
//!
//! 发布方与订阅方之间的参数类型一致性由调用方保证，运行时仅做校验并报告
//! `BusError::TypeMismatch`，不提供编译期的事件模式注册。
//!
//! 典型用法：
//! 1. `EventBus::subscribe` 注册处理器，多参数事件使用元组作为参数类型；
//! 2. `EventBus::trigger` 在当前线程同步派发；
//! 3. `EventLoop::enqueue` 推迟到工作线程派发，`wait_until_finished` 等待排空；
//! 4. 或直接使用 `SharedContext` 省去显式传递注册表句柄。
//!
//! ```rust
//! use microbus::{EventBus, EventLoop};
//! use std::sync::Arc;
//!
//! let bus = Arc::new(EventBus::new());
//! bus.subscribe("OnCalc", |(value, times): &(f64, i32)| {
//!     println!("{value} * {times} = {}", value * f64::from(*times));
//! });
//! bus.trigger("OnCalc", (1.5_f64, 4_i32))?;
//!
//! let event_loop = EventLoop::new()?;
//! event_loop.enqueue(&bus, "OnCalc", (2.0_f64, 8_i32))?;
//! event_loop.wait_until_finished();
//! event_loop.stop();
//! # Ok::<(), microbus::BusError>(())
//! ```
//!
pub mod context;
pub mod dispatch;
pub mod error;
pub mod event_bus;
pub mod handler;
pub mod subscription;

pub use context::SharedContext;
pub use dispatch::{EventLoop, EventLoopConfig};
pub use error::{BusError, BusResult};
pub use event_bus::EventBus;
pub use handler::{ArgBundle, HandlerCell};
pub use subscription::SubscriptionId;
