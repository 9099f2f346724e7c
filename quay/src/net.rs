use std::{net::SocketAddr, sync::Arc, time::Duration};

use thiserror::Error;
use tokio::{
	io::{self, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
	net::{TcpListener, TcpSocket},
	sync::watch,
	time::{error::Elapsed, timeout},
};
use tracing::{debug, error, warn};

use crate::protocol::{Handler, Session, SessionError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Bind a listening socket with a bounded backlog.
pub fn bind(address: SocketAddr, backlog: u32) -> io::Result<TcpListener> {
	let socket = match address {
		SocketAddr::V4(_) => TcpSocket::new_v4()?,
		SocketAddr::V6(_) => TcpSocket::new_v6()?,
	};

	socket.set_reuseaddr(true)?;
	socket.bind(address)?;
	socket.listen(backlog)
}

// runs as long as the MTA keeps the connection open, which may be for many
// transactions. All the protocol work happens in Session and Handler.
pub async fn serve<S>(
	mut stream: S,
	handler: Arc<Handler>,
	mut rx: watch::Receiver<bool>,
) -> Result<(), ServeError>
where
	S: AsyncRead + AsyncWrite + Unpin,
{
	let limits = handler.limits();
	let mut session = Session::new(limits);

	let mut buf = vec![0; 1024];

	loop {
		let read = tokio::select! {
			read = read_within(&mut stream, &mut buf, limits.idle_timeout) => read?,
			_ = rx.changed() => return Ok(()),
		};

		// A zero sized read, the MTA is done with us
		if read == 0 {
			debug!("Connection closed by client");
			return Ok(());
		}

		session.push(&buf[..read]);

		while let Some(transaction) = session.next_transaction()? {
			let response = handler.respond(transaction).await;
			stream.write_all(response.as_string().as_bytes()).await?;
		}
	}
}

async fn read_within<S>(
	stream: &mut S,
	buf: &mut [u8],
	idle: Option<Duration>,
) -> Result<usize, ServeError>
where
	S: AsyncRead + Unpin,
{
	match idle {
		Some(idle) => Ok(timeout(idle, stream.read(buf)).await??),
		None => Ok(stream.read(buf).await?),
	}
}

// waits for new connections, dispatches a new task to handle each of them
pub async fn listen(listener: TcpListener, handler: Arc<Handler>, mut rx: watch::Receiver<bool>) {
	loop {
		let accepted = tokio::select! {
			_ = rx.changed() => break,
			accepted = listener.accept() => accepted,
		};

		let (stream, clientaddr) = match accepted {
			Ok(accepted) => accepted,
			Err(err) => {
				error!("Failed to accept connection: {}", err);
				if backoff(&mut rx).await {
					break;
				}
				continue;
			}
		};

		debug!(
			"Connect from {}, port {}.",
			clientaddr.ip(),
			clientaddr.port()
		);

		let handler = handler.clone();
		let rx = rx.clone();
		tokio::spawn(async move {
			if let Err(err) = serve(stream, handler, rx).await {
				warn!("Closed connection from {}: {}", clientaddr, err);
			}
		});
	}
}

// Errors like EMFILE persist until a connection closes, so don't spin on them.
// True when shutdown was asked for while waiting.
async fn backoff(rx: &mut watch::Receiver<bool>) -> bool {
	tokio::select! {
		_ = rx.changed() => true,
		_ = tokio::time::sleep(ACCEPT_BACKOFF) => false,
	}
}

#[derive(Debug, Error)]
pub enum ServeError {
	#[error("there was an error on the connection: {0}")]
	Io(#[from] io::Error),
	#[error("connection was idle for too long")]
	IdleTimeout(#[from] Elapsed),
	#[error("{0}")]
	Session(#[from] SessionError),
}
