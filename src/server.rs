//! The dev server and the reload hub.
//!
//! The HTTP side is a static file service over the output directory. The
//! reload hub keeps a websocket connection to every open browser tab and
//! broadcasts `"reload"` when the watcher finishes a rebuild; the client
//! snippet appended to rendered pages listens for it.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use axum::Router;
use camino::Utf8PathBuf;
use console::style;
use tower_http::services::ServeDir;
use tungstenite::WebSocket;

use crate::error::ServerError;

/// Preferred reload websocket port; an ephemeral port is used if taken.
const RELOAD_PORT: u16 = 1337;

type Clients = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

pub struct ReloadHub {
    port: u16,
    tx: Sender<()>,
}

impl ReloadHub {
    /// Bind the websocket listener and spawn the accept and broadcast
    /// threads. They run until process exit.
    pub fn start() -> Result<Self, ServerError> {
        let (tcp, port) = reserve_port()?;
        let clients: Clients = Arc::new(Mutex::new(vec![]));

        let _incoming = new_thread_ws_incoming(tcp, clients.clone());
        let (tx, _outgoing) = new_thread_ws_reload(clients);

        Ok(Self { port, tx })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Broadcast a reload signal to every connected client.
    pub fn reload(&self) {
        self.tx.send(()).ok();
    }
}

fn reserve_port() -> Result<(TcpListener, u16), ServerError> {
    let listener = match TcpListener::bind(("127.0.0.1", RELOAD_PORT)) {
        Ok(sock) => sock,
        Err(_) => TcpListener::bind("127.0.0.1:0").map_err(ServerError::Bind)?,
    };

    let addr = listener.local_addr().map_err(ServerError::Bind)?;
    let port = addr.port();
    Ok((listener, port))
}

fn new_thread_ws_incoming(server: TcpListener, client: Clients) -> JoinHandle<()> {
    thread::spawn(move || {
        for stream in server.incoming() {
            let Ok(stream) = stream else { continue };
            match tungstenite::accept(stream) {
                Ok(socket) => client.lock().unwrap().push(socket),
                Err(e) => tracing::error!("websocket handshake failed: {e}"),
            }
        }
    })
}

fn new_thread_ws_reload(client: Clients) -> (Sender<()>, JoinHandle<()>) {
    let (tx, rx) = std::sync::mpsc::channel();

    let thread = thread::spawn(move || {
        while rx.recv().is_ok() {
            let mut clients = client.lock().unwrap();
            let mut broken = vec![];

            for (i, socket) in clients.iter_mut().enumerate() {
                match socket.send("reload".into()) {
                    Ok(_) => {}
                    Err(tungstenite::error::Error::Io(e)) => {
                        if e.kind() == std::io::ErrorKind::BrokenPipe {
                            broken.push(i);
                        }
                    }
                    Err(e) => {
                        tracing::error!("reload broadcast failed: {e:?}");
                    }
                }
            }

            for i in broken.into_iter().rev() {
                clients.remove(i);
            }

            // Close all but the last 10 connections
            let len = clients.len();
            if len > 10 {
                for mut socket in clients.drain(0..len - 10) {
                    socket.close(None).ok();
                }
            }
        }
    });

    (tx, thread)
}

/// Serve the output directory on a dedicated thread. A bind failure kills
/// only this thread; the watcher keeps running.
pub fn start_http(dist: Utf8PathBuf, port: u16) -> JoinHandle<()> {
    let url = style(format!("http://localhost:{port}/")).yellow();
    eprintln!("Starting a HTTP server on {url}");

    thread::spawn(move || {
        let outcome = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(anyhow::Error::from)
            .and_then(|rt| rt.block_on(serve(dist, port)));

        if let Err(e) = outcome {
            tracing::error!("dev server stopped: {e}");
        }
    })
}

async fn serve(dist: Utf8PathBuf, port: u16) -> Result<(), anyhow::Error> {
    let address = SocketAddr::from(([127, 0, 0, 1], port));
    let address = tokio::net::TcpListener::bind(address).await?;

    let router = Router::new()
        // path to the dist directory with the generated website
        .fallback_service(ServeDir::new(dist));

    axum::serve(address, router).await?;

    Ok(())
}
