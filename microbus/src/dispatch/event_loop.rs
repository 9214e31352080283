//! 事件循环（EventLoop）
//!
//! 单消费者的异步派发器：
//! - `enqueue` 将 (注册表句柄, 事件名, 参数包) 封装为零参数任务并放入无界 FIFO 通道；
//! - 专用工作线程依次取出任务并在任何锁之外执行，执行时调用 `EventBus::trigger_bundle`；
//! - `wait_until_finished` 阻塞到所有已投递任务**执行完毕**；
//! - `stop` 关闭通道：已入队的任务全部执行完后工作线程退出；
//! - `join` / `Drop` 在 `stop` 之外还会等待工作线程退出。
//!
//! 状态：Running -> Stopping（通道已关闭，排空中）-> Stopped（工作线程已退出）。
//!
//! 处理器 panic 会被捕获并记录日志，工作线程继续处理后续任务。
//! 在本循环执行的处理器内部调用 `wait_until_finished` 会直接返回（否则必然死锁）。
//!
use super::barrier::CompletionBarrier;
use super::config::EventLoopConfig;
use crate::error::{BusError, BusResult};
use crate::event_bus::EventBus;
use crate::handler::ArgBundle;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, trace, warn};

type Task = Box<dyn FnOnce() + Send + 'static>;

pub struct EventLoop {
    sender: Mutex<Option<UnboundedSender<Task>>>,
    barrier: Arc<CompletionBarrier>,
    worker: Option<JoinHandle<()>>,
    thread_name: String,
}

impl EventLoop {
    /// 以默认配置创建事件循环并启动工作线程
    pub fn new() -> BusResult<Self> {
        Self::with_config(EventLoopConfig::default())
    }

    pub fn with_config(config: EventLoopConfig) -> BusResult<Self> {
        let (tx, rx) = mpsc::unbounded_channel::<Task>();
        let barrier = Arc::new(CompletionBarrier::default());

        let mut builder = thread::Builder::new().name(config.thread_name.clone());
        if let Some(size) = config.stack_size {
            builder = builder.stack_size(size);
        }

        let worker = {
            let barrier = barrier.clone();
            builder.spawn(move || run_worker(rx, barrier))?
        };

        debug!(thread = %config.thread_name, "event loop started");

        Ok(Self {
            sender: Mutex::new(Some(tx)),
            barrier,
            worker: Some(worker),
            thread_name: config.thread_name,
        })
    }

    /// 投递一次异步触发
    ///
    /// 参数在此刻被快照为参数包，由待执行任务持有；任务同时持有注册表的 `Arc`，
    /// 因此调用方随后释放自己的句柄也不会影响派发。
    /// 循环已 `stop` 时返回 `LoopStopped`，任务被丢弃。
    pub fn enqueue<A>(
        &self,
        bus: &Arc<EventBus>,
        event_name: impl Into<String>,
        args: A,
    ) -> BusResult<()>
    where
        A: Any + Send + Sync,
    {
        self.enqueue_bundle(bus, event_name, ArgBundle::new(args))
    }

    /// 以已构造好的参数包投递
    pub fn enqueue_bundle(
        &self,
        bus: &Arc<EventBus>,
        event_name: impl Into<String>,
        args: ArgBundle,
    ) -> BusResult<()> {
        let bus = Arc::clone(bus);
        let event_name = event_name.into();

        let task: Task = Box::new(move || {
            // 不匹配的处理器已由 trigger_bundle 逐个记录
            if let Err(err) = bus.trigger_bundle(&event_name, &args) {
                debug!(event = %event_name, error = %err, "queued dispatch finished with error");
            }
        });

        let sender = self.sender.lock();
        let Some(tx) = sender.as_ref() else {
            debug!(thread = %self.thread_name, "enqueue rejected: event loop stopped");
            return Err(BusError::LoopStopped);
        };

        self.barrier.begin();
        if tx.send(task).is_err() {
            self.barrier.finish();
            return Err(BusError::LoopStopped);
        }

        trace!(thread = %self.thread_name, "task enqueued");
        Ok(())
    }

    /// 阻塞直到所有已投递的任务执行完毕
    pub fn wait_until_finished(&self) {
        if self.is_worker_thread() {
            warn!(thread = %self.thread_name, "wait_until_finished called from the worker thread; ignored");
            return;
        }
        self.barrier.wait();
    }

    /// 已投递但尚未执行完的任务数
    pub fn pending(&self) -> usize {
        self.barrier.outstanding()
    }

    /// 发出停止信号（非阻塞，可重复调用）
    ///
    /// 已入队的任务仍会全部执行；此后的 `enqueue` 立即返回 `LoopStopped`，
    /// 即使工作线程仍在排空（Stopping）也不再接收新任务。
    pub fn stop(&self) {
        if self.sender.lock().take().is_some() {
            debug!(thread = %self.thread_name, pending = self.pending(), "event loop stopping");
        }
    }

    /// 是否已停止接收新任务
    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// 停止并等待工作线程排空队列后退出
    pub fn join(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        self.stop();

        let Some(worker) = self.worker.take() else {
            return;
        };

        // 最后一个持有者在处理器内部释放了循环：当前线程就是工作线程，无法自我 join
        if worker.thread().id() == thread::current().id() {
            warn!(thread = %self.thread_name, "event loop dropped on its own worker thread; detaching");
            return;
        }

        if worker.join().is_err() {
            error!(thread = %self.thread_name, "event loop worker terminated abnormally");
        } else {
            debug!(thread = %self.thread_name, "event loop stopped");
        }
    }

    fn is_worker_thread(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|w| w.thread().id() == thread::current().id())
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

impl Debug for EventLoop {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("thread_name", &self.thread_name)
            .field("pending", &self.pending())
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn run_worker(mut rx: UnboundedReceiver<Task>, barrier: Arc<CompletionBarrier>) {
    trace!("event loop worker running");

    // 通道关闭且队列排空后 blocking_recv 返回 None
    while let Some(task) = rx.blocking_recv() {
        if let Err(panic_err) = panic::catch_unwind(AssertUnwindSafe(task)) {
            error!(reason = %panic_message(&*panic_err), "event handler panicked");
        }
        barrier.finish();
    }

    trace!("event loop worker exited");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
