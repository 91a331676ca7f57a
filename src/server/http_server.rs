use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use http::Method;
use tracing::{debug, error, info, warn};

use super::request::into_http_request;
use super::response::{into_wire_response, plain};
use crate::context::{BufferedResponse, Context};
use crate::dispatcher::Dispatcher;
use crate::handler::{handler, HandlerRef, MiddlewareRef};
use crate::router::{Router, RouterError};
use crate::runtime_config::RuntimeConfig;

/// Handle to a running server's listener and worker threads.
pub struct ServerHandle {
    addr: SocketAddr,
    server: Arc<tiny_http::Server>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl ServerHandle {
    /// The bound address; useful when starting on port 0.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the server to be ready to accept connections
    ///
    /// Polls the server address by attempting TCP connections until successful.
    ///
    /// # Errors
    ///
    /// Returns `TimedOut` if the server doesn't accept within ~250ms (50 attempts × 5ms).
    pub fn wait_ready(&self) -> io::Result<()> {
        for _ in 0..50 {
            if TcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"))
    }

    /// A cloneable trigger that asks the workers to exit without owning the
    /// handle.
    #[must_use]
    pub fn shutdown_trigger(&self) -> ShutdownTrigger {
        ShutdownTrigger {
            server: Arc::clone(&self.server),
            shutdown: Arc::clone(&self.shutdown),
            workers: self.workers.len(),
        }
    }

    /// Stop accepting work, wake every idle worker and wait for them to exit.
    /// Requests already being handled run to completion.
    pub fn stop(self) {
        self.shutdown_trigger().fire();
        for worker in self.workers {
            if worker.join().is_err() {
                warn!("worker thread exited by panic");
            }
        }
        info!(addr = %self.addr, "server stopped");
    }

    /// Block until every worker exits.
    ///
    /// Workers only leave their loop once shutdown is requested, and `stop`
    /// consumes the handle, so `join` is for processes that serve until they
    /// are killed. Use [`ServerHandle::shutdown_trigger`] to stop a joined
    /// server from another thread.
    pub fn join(self) {
        for worker in self.workers {
            if worker.join().is_err() {
                warn!("worker thread exited by panic");
            }
        }
    }
}

/// Requests shutdown of a running server from any thread.
///
/// Firing does not wait; whoever holds the [`ServerHandle`] observes the
/// workers exiting through `join`.
#[derive(Clone)]
pub struct ShutdownTrigger {
    server: Arc<tiny_http::Server>,
    shutdown: Arc<AtomicBool>,
    workers: usize,
}

impl ShutdownTrigger {
    pub fn fire(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        for _ in 0..self.workers {
            self.server.unblock();
        }
    }
}

impl std::fmt::Debug for ShutdownTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownTrigger")
            .field("fired", &self.shutdown.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle")
            .field("addr", &self.addr)
            .field("workers", &self.workers.len())
            .finish_non_exhaustive()
    }
}

/// Registration surface plus listener.
///
/// Routes and middleware are added while the server is being set up; `start`
/// freezes them into a [`Dispatcher`] shared by all worker threads.
///
/// ```rust,ignore
/// let mut server = HttpServer::new();
/// server.use_middleware(RecoverBuilder::default().build());
/// server.get("/user/:id", |ctx| {
///     match ctx.path_value("id").int64() {
///         Ok(id) => ctx.respond_text(200, format!("user {id}")),
///         Err(err) => ctx.respond_text(400, err.to_string()),
///     }
/// })?;
/// let handle = server.start("127.0.0.1:8080")?;
/// handle.join();
/// ```
pub struct HttpServer {
    router: Router,
    middlewares: Vec<MiddlewareRef>,
    config: RuntimeConfig,
}

impl Default for HttpServer {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpServer {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    #[must_use]
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            router: Router::new(),
            middlewares: Vec::new(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Append a middleware. The first one added is the outermost.
    pub fn use_middleware(&mut self, middleware: MiddlewareRef) -> &mut Self {
        self.middlewares.push(middleware);
        self
    }

    pub fn add_route(
        &mut self,
        method: Method,
        path: &str,
        handler: HandlerRef,
    ) -> Result<(), RouterError> {
        self.router.add_route(method, path, handler)
    }

    pub fn get<F>(&mut self, path: &str, f: F) -> Result<(), RouterError>
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.add_route(Method::GET, path, handler(f))
    }

    pub fn post<F>(&mut self, path: &str, f: F) -> Result<(), RouterError>
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.add_route(Method::POST, path, handler(f))
    }

    pub fn put<F>(&mut self, path: &str, f: F) -> Result<(), RouterError>
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.add_route(Method::PUT, path, handler(f))
    }

    pub fn patch<F>(&mut self, path: &str, f: F) -> Result<(), RouterError>
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.add_route(Method::PATCH, path, handler(f))
    }

    pub fn delete<F>(&mut self, path: &str, f: F) -> Result<(), RouterError>
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.add_route(Method::DELETE, path, handler(f))
    }

    pub fn options<F>(&mut self, path: &str, f: F) -> Result<(), RouterError>
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.add_route(Method::OPTIONS, path, handler(f))
    }

    /// Freeze routes and middleware into a dispatcher without listening.
    #[must_use]
    pub fn into_dispatcher(self) -> Dispatcher {
        Dispatcher::new(self.router, self.middlewares)
    }

    /// Start on the configured `addr`.
    pub fn start_configured(self) -> io::Result<ServerHandle> {
        let addr = self.config.addr.clone();
        self.start(addr)
    }

    /// Bind `addr` and spawn the worker threads.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid, the port cannot be bound,
    /// or a worker thread cannot be spawned.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid address"))?;
        let server = tiny_http::Server::http(addr).map_err(io::Error::other)?;
        let bound = server
            .server_addr()
            .to_ip()
            .ok_or_else(|| io::Error::other("listener is not bound to an IP address"))?;
        let server = Arc::new(server);

        for (method, template) in self.router.routes() {
            debug!(method = %method, path = %template, "serving route");
        }

        let workers = self.config.workers.max(1);
        let max_form_bytes = self.config.max_form_bytes;
        let dispatcher = Arc::new(self.into_dispatcher());
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let server = Arc::clone(&server);
            let dispatcher = Arc::clone(&dispatcher);
            let shutdown = Arc::clone(&shutdown);
            let handle = thread::Builder::new()
                .name(format!("lr-worker-{id}"))
                .spawn(move || worker_loop(&server, &dispatcher, &shutdown, max_form_bytes))?;
            handles.push(handle);
        }

        info!(
            addr = %bound,
            workers,
            middleware_count = dispatcher.middleware_count(),
            "server listening"
        );
        Ok(ServerHandle {
            addr: bound,
            server,
            workers: handles,
            shutdown,
        })
    }
}

fn worker_loop(
    server: &tiny_http::Server,
    dispatcher: &Dispatcher,
    shutdown: &AtomicBool,
    max_form_bytes: usize,
) {
    loop {
        match server.recv() {
            Ok(request) => serve(dispatcher, request, max_form_bytes),
            Err(_) if shutdown.load(Ordering::SeqCst) => break,
            Err(err) => warn!(error = %err, "failed to receive request"),
        }
    }
}

fn serve(dispatcher: &Dispatcher, mut request: tiny_http::Request, max_form_bytes: usize) {
    let http_req = match into_http_request(&mut request, max_form_bytes) {
        Ok(req) => req,
        Err(err) => {
            let status = err.status();
            warn!(error = %err, status, url = %request.url(), "rejecting request");
            let reason = if status == 413 {
                "Payload Too Large"
            } else {
                "Bad Request"
            };
            if let Err(err) = request.respond(plain(status, reason)) {
                debug!(error = %err, "failed to send response");
            }
            return;
        }
    };

    let mut out = BufferedResponse::new();
    let outcome = {
        let mut ctx = Context::new(http_req, &mut out).with_max_form_bytes(max_form_bytes);
        panic::catch_unwind(AssertUnwindSafe(|| dispatcher.dispatch(&mut ctx)))
    };
    let response = match outcome {
        Ok(Ok(())) => into_wire_response(out),
        // Already logged by the dispatcher
        Ok(Err(_)) => plain(500, "Internal Server Error"),
        Err(_) => {
            error!(url = %request.url(), "handler panicked outside a recovery middleware");
            plain(500, "Internal Server Error")
        }
    };
    if let Err(err) = request.respond(response) {
        debug!(error = %err, "failed to send response");
    }
}
