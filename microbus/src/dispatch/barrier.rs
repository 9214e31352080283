use parking_lot::{Condvar, Mutex};

/// 未完成任务计数器
///
/// 投递时加一，任务**执行完毕**后减一；计数与唤醒在同一把锁下完成，
/// 等待方不会在「队列已空但最后一个任务仍在执行」时提前返回。
#[derive(Debug, Default)]
pub(crate) struct CompletionBarrier {
    outstanding: Mutex<usize>,
    drained: Condvar,
}

impl CompletionBarrier {
    pub(crate) fn begin(&self) {
        *self.outstanding.lock() += 1;
    }

    pub(crate) fn finish(&self) {
        let mut outstanding = self.outstanding.lock();
        *outstanding = outstanding.saturating_sub(1);
        if *outstanding == 0 {
            self.drained.notify_all();
        }
    }

    pub(crate) fn wait(&self) {
        let mut outstanding = self.outstanding.lock();
        while *outstanding > 0 {
            self.drained.wait(&mut outstanding);
        }
    }

    pub(crate) fn outstanding(&self) -> usize {
        *self.outstanding.lock()
    }
}
