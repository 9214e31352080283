use anyhow::Result as AnyResult;
use microbus::{ArgBundle, EventBus, EventLoop, EventLoopConfig, SharedContext};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn factorial(n: u64) -> u64 {
    (1..=n).product()
}

#[test]
fn factorial_events_drain_in_enqueue_order() -> AnyResult<()> {
    let bus = Arc::new(EventBus::new());
    let results = Arc::new(Mutex::new(Vec::new()));
    let sink = results.clone();
    bus.subscribe("OnFactorial", move |n: &u64| {
        thread::sleep(Duration::from_millis(5));
        sink.lock().unwrap().push((*n, factorial(*n)));
    });

    let event_loop = EventLoop::new()?;
    for n in [15_u64, 17, 19] {
        event_loop.enqueue(&bus, "OnFactorial", n)?;
    }
    for n in [16_u64, 18, 20] {
        event_loop.enqueue(&bus, "OnFactorial", n)?;
    }
    event_loop.wait_until_finished();
    event_loop.stop();

    let results = results.lock().unwrap();
    let order: Vec<u64> = results.iter().map(|(n, _)| *n).collect();
    assert_eq!(order, vec![15, 17, 19, 16, 18, 20]);
    assert_eq!(results[5].1, 2_432_902_008_176_640_000);

    bus.clear();
    assert!(bus.is_empty());
    Ok(())
}

#[test]
fn stop_still_drains_everything_queued_before_it() -> AnyResult<()> {
    const K: usize = 100;

    let bus = Arc::new(EventBus::new());
    let handled = Arc::new(AtomicUsize::new(0));
    let c = handled.clone();
    bus.subscribe("Work", move |_: &usize| {
        thread::sleep(Duration::from_micros(200));
        c.fetch_add(1, Ordering::SeqCst);
    });

    let event_loop = EventLoop::new()?;
    for i in 0..K {
        event_loop.enqueue(&bus, "Work", i)?;
    }
    event_loop.stop();
    event_loop.join();

    assert_eq!(handled.load(Ordering::SeqCst), K);
    Ok(())
}

#[test]
fn drop_joins_after_draining() -> AnyResult<()> {
    let bus = Arc::new(EventBus::new());
    let handled = Arc::new(AtomicUsize::new(0));
    let c = handled.clone();
    bus.subscribe("Work", move |_: &()| {
        c.fetch_add(1, Ordering::SeqCst);
    });

    {
        let event_loop = EventLoop::new()?;
        for _ in 0..10 {
            event_loop.enqueue(&bus, "Work", ())?;
        }
    }

    assert_eq!(handled.load(Ordering::SeqCst), 10);
    Ok(())
}

#[test]
fn queued_task_keeps_registry_alive() -> AnyResult<()> {
    let handled = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Mutex::new(()));
    let event_loop = EventLoop::new()?;

    let weak: Weak<EventBus> = {
        let bus = Arc::new(EventBus::new());
        let c = handled.clone();
        let g = gate.clone();
        bus.subscribe("Late", move |_: &()| {
            let _open = g.lock().unwrap();
            c.fetch_add(1, Ordering::SeqCst);
        });

        // 阻塞工作线程，保证任务在调用方释放句柄后才执行
        let held = gate.lock().unwrap();
        event_loop.enqueue(&bus, "Late", ())?;
        event_loop.enqueue(&bus, "Late", ())?;
        let weak = Arc::downgrade(&bus);
        drop(bus);
        assert!(weak.upgrade().is_some(), "pending tasks must hold the registry");
        drop(held);
        weak
    };

    event_loop.wait_until_finished();
    assert_eq!(handled.load(Ordering::SeqCst), 2);
    assert!(weak.upgrade().is_none());
    Ok(())
}

#[test]
fn mismatched_async_args_are_skipped_without_stalling() -> AnyResult<()> {
    let bus = Arc::new(EventBus::new());
    let hits = Arc::new(AtomicUsize::new(0));
    let c = hits.clone();
    bus.subscribe("Typed", move |n: &i64| {
        c.fetch_add(*n as usize, Ordering::SeqCst);
    });

    let event_loop = EventLoop::new()?;
    event_loop.enqueue(&bus, "Typed", String::from("not a number"))?;
    event_loop.enqueue_bundle(&bus, "Typed", ArgBundle::new(5_i64))?;
    event_loop.wait_until_finished();

    assert_eq!(hits.load(Ordering::SeqCst), 5);
    assert_eq!(event_loop.pending(), 0);
    Ok(())
}

#[test]
fn enqueue_from_many_threads_is_fully_counted() -> AnyResult<()> {
    const THREADS: usize = 4;
    const PER_THREAD: usize = 250;

    let context = Arc::new(SharedContext::with_config(
        EventLoopConfig::builder().thread_name("workflow-loop").build(),
    )?);
    let total = Arc::new(AtomicUsize::new(0));
    let c = total.clone();
    context.subscribe("Add", move |n: &usize| {
        c.fetch_add(*n, Ordering::SeqCst);
    });

    let producers: Vec<_> = (0..THREADS)
        .map(|_| {
            let context = context.clone();
            thread::spawn(move || -> AnyResult<()> {
                for _ in 0..PER_THREAD {
                    context.enqueue("Add", 1_usize)?;
                }
                Ok(())
            })
        })
        .collect();
    for p in producers {
        p.join().expect("producer panicked")?;
    }

    context.wait_until_finished();
    assert_eq!(total.load(Ordering::SeqCst), THREADS * PER_THREAD);
    context.stop();
    Ok(())
}

#[test]
fn async_and_sync_dispatch_share_one_registry() -> AnyResult<()> {
    let context = SharedContext::new()?;
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    context.subscribe("OnMessage", move |msg: &String| {
        sink.lock().unwrap().push(msg.clone());
    });

    context.bus().trigger("OnMessage", String::from("sync"))?;
    context.enqueue("OnMessage", String::from("async"))?;
    context.wait_until_finished();

    assert_eq!(*log.lock().unwrap(), vec!["sync", "async"]);
    Ok(())
}
