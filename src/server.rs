use crate::error::{Result, SongStoreError};
use crate::{Handlers, StoreGateway};
use log::{error, info};
use rouille::{router, Request, Response};

/// Represents a song server instance, wrapping the request handlers,
/// accepting incoming http requests.
///
/// Requests are served concurrently on a pool of worker threads; handlers
/// share nothing but the store.
#[derive(Clone)]
pub struct Server<G: StoreGateway> {
    handlers: Handlers<G>,
    threads: usize,
}

impl<G: StoreGateway> Server<G> {
    /// Construct a new server.
    pub fn new(handlers: Handlers<G>, threads: usize) -> Server<G> {
        Server {
            handlers,
            threads: threads.max(1),
        }
    }

    /// Route a single request to its handler and log the outcome.
    pub fn handle(&self, request: &Request) -> Response {
        rouille::log_custom(
            request,
            |req, resp, elapsed| {
                info!(
                    "{} {} -> {} ({} ms)",
                    req.method(),
                    req.raw_url(),
                    resp.status_code,
                    elapsed.as_millis()
                )
            },
            |req, elapsed| {
                error!(
                    "{} {} -> panicked ({} ms)",
                    req.method(),
                    req.raw_url(),
                    elapsed.as_millis()
                )
            },
            || self.route(request),
        )
    }

    fn route(&self, request: &Request) -> Response {
        let handlers = &self.handlers;

        router!(request,
            (GET) (/health) => { handlers.health() },
            (GET) (/count) => { handlers.count() },
            (GET) (/song) => { handlers.list() },
            (POST) (/song) => { handlers.create(request) },
            (GET) (/song/{id: i64}) => { handlers.get(id) },
            (PUT) (/song/{id: i64}) => { handlers.update(request, id) },
            (DELETE) (/song/{id: i64}) => { handlers.delete(id) },
            _ => Response::empty_404()
        )
    }

    /// Listen on the given address for incoming requests. Only returns on
    /// failure to bind.
    pub fn listen(self, addr: &str) -> Result<()> {
        let threads = self.threads;

        let server = rouille::Server::new(addr, move |request| self.handle(request))
            .map_err(|e| SongStoreError::BindFailure {
                addr: addr.to_string(),
                reason: e.to_string(),
            })?
            .pool_size(threads);

        info!(
            "Listening on '{}' with {} worker threads.",
            server.server_addr(),
            threads
        );
        server.run();

        Ok(())
    }
}
