use microbus::{EventBus, EventLoop, SharedContext};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn factorial(n: u64) -> u64 {
    (1..=n).product()
}

fn sync_events(events: &EventBus) -> anyhow::Result<()> {
    let _calc_id = events.subscribe("OnCalc", |(value, multiply_by): &(f64, i32)| {
        info!(
            "Multiplying {value} by {multiply_by} is {}",
            value * f64::from(*multiply_by)
        );
    });

    // 处理器捕获外部状态
    let greeting = String::from("Hello, ");
    let message_id = events.subscribe("OnMessage", move |message: &String| {
        info!("{greeting}{message}");
    });

    let pie = std::f64::consts::PI;
    events.trigger("OnCalc", (pie, 4_i32))?;
    events.trigger("OnMessage", String::from("Joe"))?;

    events.unsubscribe("OnMessage", message_id);

    events.trigger("OnCalc", (pie, 8_i32))?;
    // 已退订，不会有输出
    events.trigger("OnMessage", String::from("Jane"))?;

    events.clear();
    Ok(())
}

fn cross_thread_trigger(events: &Arc<EventBus>) -> anyhow::Result<()> {
    let id = events.subscribe("OnSmartPtrMessage", |message: &Arc<String>| {
        info!("Received message: {message}");
    });

    let publisher = {
        let events = events.clone();
        thread::spawn(move || {
            let message = Arc::new(String::from("Hello from another thread!"));
            events.trigger("OnSmartPtrMessage", message)
        })
    };
    publisher
        .join()
        .map_err(|_| anyhow::anyhow!("publisher thread panicked"))??;

    events.unsubscribe("OnSmartPtrMessage", id);
    events.clear();
    Ok(())
}

fn event_loop_drain() -> anyhow::Result<()> {
    let shared_bus = Arc::new(EventBus::new());
    let event_loop = EventLoop::new()?;

    shared_bus.subscribe("OnFactorial", |number: &u64| {
        let result = factorial(*number);
        thread::sleep(Duration::from_millis(500));
        info!("Factorial of {number} is {result}");
    });

    for number in [15_u64, 17, 19] {
        event_loop.enqueue(&shared_bus, "OnFactorial", number)?;
    }
    for number in [16_u64, 18, 20] {
        event_loop.enqueue(&shared_bus, "OnFactorial", number)?;
    }

    event_loop.wait_until_finished();
    event_loop.stop();

    shared_bus.clear();
    Ok(())
}

fn shared_context() -> anyhow::Result<()> {
    let context = SharedContext::new()?;

    let on_number_id = context.subscribe("OnNumber", |number: &u64| {
        info!("Number {number} was passed to event.");
    });
    context.enqueue("OnNumber", 69_u64)?;

    context.wait_until_finished();
    context.unsubscribe("OnNumber", on_number_id);
    context.stop();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let events = Arc::new(EventBus::new());
    sync_events(&events)?;
    cross_thread_trigger(&events)?;
    event_loop_drain()?;
    shared_context()?;
    Ok(())
}
