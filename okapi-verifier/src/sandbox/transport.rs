//! Transports carrying verifier sessions.
//!
//! Both transports are loopback-only: the verifier is always a child
//! process on the same machine. TCP binds an ephemeral localhost port; the
//! unix transport puts a socket file inside a fresh owner-only temporary
//! directory, and removes the directory again when the listener is
//! dropped.

use std::{fmt, io, net::SocketAddr, path::PathBuf};

use tokio::net::{TcpListener, TcpStream};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};
#[cfg(unix)]
use tokio_util::either::Either;

use crate::config::TransportKind;
#[cfg(unix)]
use crate::constants;

/// The address a bound [`Listener`] can be reached at.
///
/// Rendered with `Display`, this is exactly the first command line
/// argument handed to the verifier process.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ListenAddr {
    /// A TCP socket address on the loopback interface.
    Tcp(SocketAddr),

    /// The path of a unix domain socket.
    Unix(PathBuf),
}

impl fmt::Display for ListenAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ListenAddr::Tcp(addr) => addr.fmt(f),
            ListenAddr::Unix(path) => path.display().fmt(f),
        }
    }
}

/// A connected byte stream to the verifier, over either transport.
#[cfg(unix)]
pub type SandboxStream = Either<TcpStream, UnixStream>;

/// A connected byte stream to the verifier.
#[cfg(not(unix))]
pub type SandboxStream = TcpStream;

/// A listener waiting for the verifier process to connect back.
#[derive(Debug)]
pub enum Listener {
    /// A TCP listener on an ephemeral loopback port.
    Tcp(TcpListener),

    /// A unix socket listener, together with the temporary directory
    /// holding the socket file.
    ///
    /// Dropping the listener removes the directory and the socket file
    /// inside it.
    #[cfg(unix)]
    Unix {
        /// The bound listener.
        listener: UnixListener,
        /// The owner-only directory containing the socket file.
        dir: tempfile::TempDir,
    },
}

impl Listener {
    /// Bind a fresh listener for the given transport.
    pub async fn bind(transport: TransportKind) -> io::Result<Listener> {
        match transport {
            TransportKind::Tcp => {
                let listener = TcpListener::bind("127.0.0.1:0").await?;
                info!(addr = ?listener.local_addr()?, "bound verifier listener");
                Ok(Listener::Tcp(listener))
            }
            #[cfg(unix)]
            TransportKind::Unix => {
                // The socket file itself gets whatever the platform gives
                // it; the 0700 directory is what keeps other users out.
                let dir = tempfile::Builder::new()
                    .prefix("okapi-verifier")
                    .permissions(std::fs::Permissions::from_mode(0o700))
                    .tempdir()?;
                let path = dir.path().join(constants::SOCKET_FILE);
                let listener = UnixListener::bind(&path)?;
                info!(path = %path.display(), "bound verifier listener");
                Ok(Listener::Unix { listener, dir })
            }
        }
    }

    /// The address the verifier process should connect back to.
    pub fn local_addr(&self) -> io::Result<ListenAddr> {
        match self {
            Listener::Tcp(listener) => Ok(ListenAddr::Tcp(listener.local_addr()?)),
            #[cfg(unix)]
            Listener::Unix { dir, .. } => {
                Ok(ListenAddr::Unix(dir.path().join(constants::SOCKET_FILE)))
            }
        }
    }

    /// Wait for the verifier process to connect.
    pub async fn accept(&self) -> io::Result<SandboxStream> {
        match self {
            Listener::Tcp(listener) => {
                let (stream, addr) = listener.accept().await?;
                debug!(?addr, "accepted verifier connection");
                #[cfg(unix)]
                let stream = Either::Left(stream);
                Ok(stream)
            }
            #[cfg(unix)]
            Listener::Unix { listener, .. } => {
                let (stream, _) = listener.accept().await?;
                debug!("accepted verifier connection");
                Ok(Either::Right(stream))
            }
        }
    }
}
