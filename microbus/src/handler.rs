//! 类型擦除的处理器与参数包
//!
//! 注册表需要在同一个容器中存放参数类型各不相同的回调：
//! - `HandlerCell`：持有一个回调及其构造时绑定的参数类型，对外只暴露 `invoke`；
//! - `ArgBundle`：一次触发/投递的参数快照，以 `Arc<dyn Any>` 共享给所有处理器。
//!
//! 多参数事件以元组作为参数类型，例如 `(f64, i32)`；无参数事件使用 `()`。
//!
//! 发布方与订阅方之间的类型一致性由调用方保证。`invoke` 在运行时校验参数包的
//! 实际类型，不一致时不会调用回调，而是返回 `BusError::TypeMismatch`。
//!
use crate::error::{BusError, BusResult};
use std::any::{Any, type_name};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

type AnySendSync = dyn Any + Send + Sync;

type InvokeFn = Box<dyn Fn(&AnySendSync) -> bool + Send + Sync>;

/// 参数包：不可变、可廉价克隆的参数快照
///
/// 同步触发时在调用栈上创建；异步投递时由待执行任务共同持有，
/// 直到工作线程执行完该任务。
#[derive(Clone)]
pub struct ArgBundle {
    value: Arc<AnySendSync>,
    type_name: &'static str,
}

impl ArgBundle {
    pub fn new<A>(args: A) -> Self
    where
        A: Any + Send + Sync,
    {
        Self {
            value: Arc::new(args),
            type_name: type_name::<A>(),
        }
    }

    /// 构造参数包时的具体类型名
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<A: Any>(&self) -> Option<&A> {
        (*self.value).downcast_ref::<A>()
    }

    fn as_any(&self) -> &AnySendSync {
        &*self.value
    }
}

impl Debug for ArgBundle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArgBundle")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// 处理器单元：一个回调 + 它期望的参数类型
pub struct HandlerCell {
    invoke: InvokeFn,
    args_type: &'static str,
}

impl HandlerCell {
    pub fn new<A, F>(handler: F) -> Self
    where
        A: Any + Send + Sync,
        F: Fn(&A) + Send + Sync + 'static,
    {
        let invoke: InvokeFn = Box::new(move |args| match args.downcast_ref::<A>() {
            Some(args) => {
                handler(args);
                true
            }
            None => false,
        });

        Self {
            invoke,
            args_type: type_name::<A>(),
        }
    }

    /// 以参数包调用处理器
    ///
    /// 参数包类型与构造时绑定的类型不一致时返回 `TypeMismatch`，回调不会被执行。
    pub fn invoke(&self, args: &ArgBundle) -> BusResult<()> {
        if (self.invoke)(args.as_any()) {
            Ok(())
        } else {
            Err(BusError::TypeMismatch {
                expected: self.args_type,
                found: args.type_name(),
            })
        }
    }

    pub fn args_type(&self) -> &'static str {
        self.args_type
    }
}

impl Debug for HandlerCell {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerCell")
            .field("args_type", &self.args_type)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn invoke_passes_tuple_arguments() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let cell = HandlerCell::new(move |(value, times): &(f64, i32)| {
            sink.lock().unwrap().push(value * f64::from(*times));
        });

        cell.invoke(&ArgBundle::new((1.5_f64, 4_i32))).unwrap();
        cell.invoke(&ArgBundle::new((2.0_f64, 3_i32))).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![6.0, 6.0]);
        assert!(cell.args_type().contains("f64"));
    }

    #[test]
    fn invoke_with_unit_arguments() {
        let hits = Arc::new(Mutex::new(0));
        let counter = hits.clone();
        let cell = HandlerCell::new(move |_: &()| *counter.lock().unwrap() += 1);

        cell.invoke(&ArgBundle::new(())).unwrap();
        assert_eq!(*hits.lock().unwrap(), 1);
    }

    #[test]
    fn mismatched_bundle_is_reported_and_handler_not_called() {
        let called = Arc::new(Mutex::new(false));
        let flag = called.clone();
        let cell = HandlerCell::new(move |_: &String| *flag.lock().unwrap() = true);

        let err = cell.invoke(&ArgBundle::new(42_u32)).unwrap_err();
        match err {
            BusError::TypeMismatch { expected, found } => {
                assert!(expected.contains("String"));
                assert_eq!(found, "u32");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!*called.lock().unwrap());
    }

    #[test]
    fn bundle_clones_share_one_snapshot() {
        let bundle = ArgBundle::new(String::from("payload"));
        let copy = bundle.clone();

        let a = bundle.downcast_ref::<String>().unwrap();
        let b = copy.downcast_ref::<String>().unwrap();
        assert!(std::ptr::eq(a, b));
        assert!(bundle.downcast_ref::<&'static str>().is_none());
    }
}
