//! Process-level runtime and per-request render scopes.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use edge_cache::FetchInput;
use edge_core::{
    HostModel, LifecycleObserver, LifecyclePhase, RenderError, RequestContext, RouteRenderMode,
    RuntimeConfig,
};
use edge_data::{FetchClient, FetchError, FetchResponse, Fetcher};
use edge_executor::{spawn_drain_with, DeferredRegistrar, DeferredTaskScheduler, DrainHandle, PendingWork};
use edge_observability::{DiagnosticsEmitter, LogSink, StderrSink, StructuredLogger};
use edge_streaming::StreamingSink;
use futures::Sink;
use serde::de::DeserializeOwned;

/// Process-wide runtime state shared by every request.
///
/// Holds the configuration, the diagnostics sink and the outstanding-work
/// tracker. Each request gets its own [`RenderScope`] from [`EdgeRuntime::begin`].
pub struct EdgeRuntime {
    config: RuntimeConfig,
    log_sink: Arc<dyn LogSink>,
    diagnostics: DiagnosticsEmitter,
    pending: PendingWork,
    fetcher: Arc<dyn Fetcher>,
    observer: Option<Arc<dyn LifecycleObserver>>,
}

impl EdgeRuntime {
    /// Create a runtime writing diagnostics and logs to stderr.
    pub fn new(config: RuntimeConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        let log_sink: Arc<dyn LogSink> = Arc::new(StderrSink);
        Self {
            diagnostics: DiagnosticsEmitter::new(config.mode, log_sink.clone()),
            config,
            log_sink,
            pending: PendingWork::new(),
            fetcher,
            observer: None,
        }
    }

    /// Write diagnostics and structured logs to `sink`.
    pub fn with_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.diagnostics = DiagnosticsEmitter::new(self.config.mode, sink.clone());
        self.log_sink = sink;
        self
    }

    /// Notify `observer` of request lifecycle phases.
    pub fn with_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Outstanding deferred work across all requests.
    pub fn pending(&self) -> &PendingWork {
        &self.pending
    }

    /// Start rendering one request.
    pub fn begin(&self, ctx: RequestContext) -> RenderScope {
        let logger = StructuredLogger::new(ctx.request_id.clone(), self.log_sink.clone())
            .with_route(ctx.path.clone())
            .with_format(self.config.log_format);

        let scheduler = DeferredTaskScheduler::new(self.pending.clone(), logger.clone())
            .with_task_timeout(self.config.deferred_task_timeout());

        let client = FetchClient::new(
            ctx.request_id.clone(),
            ctx.render_mode(),
            self.diagnostics.scope(),
            self.fetcher.clone(),
        );

        tracing::debug!(
            request_id = %ctx.request_id,
            method = %ctx.method,
            path = %ctx.path,
            render_mode = %ctx.render_mode(),
            "render started"
        );
        notify(&self.observer, LifecyclePhase::Start, Duration::ZERO);

        RenderScope {
            ctx,
            host: self.config.host,
            client,
            scheduler,
            logger,
            observer: self.observer.clone(),
        }
    }

    /// Wait for all outstanding deferred work before the process exits.
    ///
    /// Returns false if work was still outstanding when the timeout elapsed.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.pending.wait_idle(timeout).await
    }
}

impl std::fmt::Debug for EdgeRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeRuntime")
            .field("config", &self.config)
            .field("pending", &self.pending.count())
            .finish_non_exhaustive()
    }
}

/// One request's render: its fetch boundary and its deferred tasks.
///
/// Ends with [`RenderScope::complete`] once the response is written, or
/// [`RenderScope::abort`] if no response will be produced.
pub struct RenderScope {
    ctx: RequestContext,
    host: HostModel,
    client: FetchClient,
    scheduler: DeferredTaskScheduler,
    logger: StructuredLogger,
    observer: Option<Arc<dyn LifecycleObserver>>,
}

impl RenderScope {
    /// Get the request context.
    pub fn context(&self) -> &RequestContext {
        &self.ctx
    }

    /// Rendering mode of the matched route.
    pub fn render_mode(&self) -> RouteRenderMode {
        self.ctx.render_mode()
    }

    /// Get the request's fetch client.
    pub fn client(&self) -> &FetchClient {
        &self.client
    }

    /// Get the request's structured logger.
    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    /// Fetch a URL or request-like input through the runtime.
    pub async fn fetch(&self, input: impl Into<FetchInput>) -> Result<FetchResponse, FetchError> {
        self.client.fetch(input).await
    }

    /// Fetch and deserialize a JSON body.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        input: impl Into<FetchInput>,
    ) -> Result<T, FetchError> {
        self.client.fetch_json(input).await
    }

    /// Register a callback to run after the response has been flushed.
    #[track_caller]
    pub fn after<F, Fut>(&self, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.scheduler.register(callback);
    }

    /// Get a cloneable registration handle, e.g. to register from inside a deferred task.
    pub fn registrar(&self) -> DeferredRegistrar {
        self.scheduler.registrar()
    }

    /// Number of deferred tasks registered so far.
    pub fn deferred_len(&self) -> usize {
        self.scheduler.len()
    }

    /// Flush the response and start draining deferred tasks.
    ///
    /// If the flush fails the deferred tasks are discarded and the error is
    /// returned.
    pub async fn complete<S, E>(
        self,
        sink: &mut StreamingSink<S, E>,
    ) -> Result<DrainHandle, RenderError>
    where
        S: Sink<Vec<u8>, Error = E> + Unpin,
        E: Display,
    {
        let receipt = match sink.finish().await {
            Ok(receipt) => receipt,
            Err(err) => {
                let discarded = self.scheduler.abort();
                self.logger
                    .error_builder("response flush failed")
                    .field("error", err.to_string())
                    .field_u64("discarded_tasks", discarded as u64)
                    .emit();
                notify(&self.observer, LifecyclePhase::Aborted, self.ctx.timing.elapsed());
                return Err(err);
            }
        };

        let elapsed = self.ctx.timing.elapsed();
        self.logger
            .info_builder("response flushed")
            .field_u64("bytes", receipt.bytes_written() as u64)
            .field_u64("deferred_tasks", self.scheduler.len() as u64)
            .duration_ms("elapsed_ms", elapsed)
            .emit();
        notify(&self.observer, LifecyclePhase::Flushed, elapsed);

        let timing = self.ctx.timing.clone();
        let observer = self.observer.clone();
        Ok(spawn_drain_with(self.scheduler, receipt, self.host, move |_| {
            notify(&observer, LifecyclePhase::Drained, timing.elapsed());
        }))
    }

    /// Abandon the render without producing a response.
    ///
    /// Registered deferred tasks are discarded. Returns how many were discarded.
    pub fn abort(self) -> usize {
        let discarded = self.scheduler.abort();
        self.logger
            .warn_builder("render aborted")
            .field_u64("discarded_tasks", discarded as u64)
            .emit();
        notify(&self.observer, LifecyclePhase::Aborted, self.ctx.timing.elapsed());
        discarded
    }
}

impl std::fmt::Debug for RenderScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderScope")
            .field("request_id", &self.ctx.request_id)
            .field("render_mode", &self.ctx.render_mode())
            .field("host", &self.host)
            .field("deferred", &self.scheduler.len())
            .finish_non_exhaustive()
    }
}

fn notify(observer: &Option<Arc<dyn LifecycleObserver>>, phase: LifecyclePhase, elapsed: Duration) {
    if let Some(observer) = observer {
        observer.on_phase(phase, elapsed);
    }
}
