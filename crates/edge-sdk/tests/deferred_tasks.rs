//! Deferred task execution relative to the response flush.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use edge_sdk::prelude::*;
use futures::channel::mpsc;
use futures::StreamExt;

type Sender = mpsc::UnboundedSender<Vec<u8>>;

fn runtime(config: RuntimeConfig) -> (EdgeRuntime, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let runtime = EdgeRuntime::new(config, Arc::new(MemoryFetcher::new())).with_log_sink(sink.clone());
    (runtime, sink)
}

fn response() -> (StreamingSink<Sender, mpsc::SendError>, mpsc::UnboundedReceiver<Vec<u8>>) {
    let (tx, rx) = mpsc::unbounded::<Vec<u8>>();
    (StreamingSink::new(tx, TimingContext::new()), rx)
}

#[tokio::test]
async fn test_tasks_run_once_in_order_after_flush() {
    let (runtime, _) = runtime(RuntimeConfig::development());
    let scope = runtime.begin(RequestContext::new(Method::GET, "/"));
    let ran: Arc<Mutex<Vec<(u32, Instant)>>> = Arc::new(Mutex::new(Vec::new()));

    for n in 0..3 {
        let ran = ran.clone();
        scope.after(move || async move {
            ran.lock().unwrap().push((n, Instant::now()));
            Ok(())
        });
    }

    let (mut sink, rx) = response();
    sink.send_html("<html>").await.unwrap();
    assert!(ran.lock().unwrap().is_empty());
    sink.send_html("</html>").await.unwrap();

    let handle = scope.complete(&mut sink).await.unwrap();
    let report = handle.join().await.unwrap();

    let flushed = sink.timing().mark_instant("flushed").unwrap();
    let ran = ran.lock().unwrap();
    assert_eq!(ran.iter().map(|(n, _)| *n).collect::<Vec<_>>(), vec![0, 1, 2]);
    assert!(ran.iter().all(|(_, at)| *at >= flushed));
    assert_eq!(report.execution_order(), vec![0, 1, 2]);

    let body: Vec<Vec<u8>> = rx.collect().await;
    assert_eq!(body.concat(), b"<html></html>");
}

#[tokio::test]
async fn test_failing_task_does_not_stop_others_or_alter_response() {
    let (runtime, logs) = runtime(RuntimeConfig::development());
    let scope = runtime.begin(RequestContext::new(Method::GET, "/checkout"));
    let ran = Arc::new(Mutex::new(Vec::new()));

    let first = ran.clone();
    scope.after(move || async move {
        first.lock().unwrap().push("first");
        Ok(())
    });
    scope.after(|| async { Err::<(), _>(anyhow::anyhow!("analytics endpoint unavailable")) });
    let third = ran.clone();
    scope.after(move || async move {
        third.lock().unwrap().push("third");
        Ok(())
    });

    let (mut sink, rx) = response();
    sink.send_html("<p>order placed</p>").await.unwrap();
    let report = scope.complete(&mut sink).await.unwrap().join().await.unwrap();

    assert_eq!(*ran.lock().unwrap(), vec!["first", "third"]);
    assert_eq!(report.executed(), 3);
    assert_eq!(report.failed(), 1);
    assert!(logs.contains("Error in deferred task"));
    assert!(logs.contains("analytics endpoint unavailable"));
    assert!(logs.contains("deferred_tasks.rs"));

    let body: Vec<Vec<u8>> = rx.collect().await;
    assert_eq!(body.concat(), b"<p>order placed</p>");
}

#[tokio::test]
async fn test_nested_registration_runs_in_same_drain() {
    let (runtime, _) = runtime(RuntimeConfig::development());
    let scope = runtime.begin(RequestContext::new(Method::GET, "/"));
    let ran = Arc::new(Mutex::new(Vec::new()));

    let registrar = scope.registrar();
    let outer = ran.clone();
    scope.after(move || async move {
        outer.lock().unwrap().push("outer");
        let inner = outer.clone();
        registrar.register(move || async move {
            inner.lock().unwrap().push("inner");
            Ok(())
        });
        Ok(())
    });

    let (mut sink, _rx) = response();
    let report = scope.complete(&mut sink).await.unwrap().join().await.unwrap();

    assert_eq!(*ran.lock().unwrap(), vec!["outer", "inner"]);
    assert_eq!(report.executed(), 2);
}

#[tokio::test]
async fn test_ephemeral_host_blocks_until_drained() {
    let config = RuntimeConfig::production().with_host(HostModel::Ephemeral);
    let (runtime, _) = runtime(config);
    let scope = runtime.begin(RequestContext::new(Method::GET, "/"));
    let done = Arc::new(Mutex::new(false));

    let flag = done.clone();
    scope.after(move || async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        *flag.lock().unwrap() = true;
        Ok(())
    });
    assert_eq!(runtime.pending().count(), 1);

    let (mut sink, _rx) = response();
    let handle = scope.complete(&mut sink).await.unwrap();

    assert!(handle.hold_termination(Duration::from_secs(5)).await);
    assert!(*done.lock().unwrap());
    assert!(runtime.shutdown(Duration::from_millis(10)).await);
}

#[tokio::test]
async fn test_slow_task_times_out() {
    let config = RuntimeConfig::development().with_deferred_task_timeout(Duration::from_millis(10));
    let (runtime, logs) = runtime(config);
    let scope = runtime.begin(RequestContext::new(Method::GET, "/"));

    scope.after(|| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(())
    });
    scope.after(|| async { Ok(()) });

    let (mut sink, _rx) = response();
    let report = scope.complete(&mut sink).await.unwrap().join().await.unwrap();

    assert_eq!(report.failed(), 1);
    assert_eq!(report.succeeded(), 1);
    assert!(matches!(
        report.outcomes[0].result,
        Err(DeferredTaskError::TimedOut(_))
    ));
    assert!(logs.contains("timed out"));
}

#[tokio::test]
async fn test_aborted_render_discards_tasks() {
    let (runtime, _) = runtime(RuntimeConfig::development());
    let scope = runtime.begin(RequestContext::new(Method::GET, "/"));
    let ran = Arc::new(Mutex::new(false));

    let flag = ran.clone();
    scope.after(move || async move {
        *flag.lock().unwrap() = true;
        Ok(())
    });

    assert_eq!(scope.abort(), 1);
    assert!(runtime.pending().is_idle());
    tokio::task::yield_now().await;
    assert!(!*ran.lock().unwrap());
}
