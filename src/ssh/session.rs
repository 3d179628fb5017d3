//! Session establishment: connect and authenticate with per-phase timeouts.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use ssh2::Session;
use tracing::{debug, warn};

use crate::config::EndpointConfig;
use crate::credentials::CredentialSelector;
use crate::error::ExecuteError;

const LIBSSH2_ERROR_TIMEOUT: i32 = -9;
const LIBSSH2_ERROR_AUTHENTICATION_FAILED: i32 = -18;

pub(crate) fn is_timeout(error: &ssh2::Error) -> bool {
    matches!(error.code(), ssh2::ErrorCode::Session(LIBSSH2_ERROR_TIMEOUT))
}

/// A live, authenticated session scoped to a single request. Disconnects on
/// drop, so every exit path releases the remote side.
pub struct SessionHandle {
    session: Session,
    closed: bool,
}

impl SessionHandle {
    /// Connect → Authenticate. Exactly one credential path is attempted:
    /// the private key registered for the endpoint's alias, or its password.
    pub fn open(
        endpoint: &EndpointConfig,
        credentials: &CredentialSelector,
    ) -> Result<Self, ExecuteError> {
        let connect_timeout = Duration::from_millis(endpoint.connection_timeout_ms);
        let tcp = connect_tcp(endpoint, connect_timeout)?;
        let _ = tcp.set_read_timeout(Some(connect_timeout));
        let _ = tcp.set_write_timeout(Some(connect_timeout));

        let mut session = Session::new().map_err(|source| ExecuteError::Handshake {
            host: endpoint.host.clone(),
            port: endpoint.port,
            source,
        })?;
        session.set_tcp_stream(tcp);
        session.set_timeout(endpoint.connection_timeout_ms as u32);
        session.handshake().map_err(|source| {
            if is_timeout(&source) {
                ExecuteError::ConnectTimeout {
                    host: endpoint.host.clone(),
                    port: endpoint.port,
                    timeout_ms: endpoint.connection_timeout_ms,
                }
            } else {
                ExecuteError::Handshake {
                    host: endpoint.host.clone(),
                    port: endpoint.port,
                    source,
                }
            }
        })?;
        debug!(host = %endpoint.host, port = endpoint.port, "SSH handshake complete");

        session.set_timeout(endpoint.auth_timeout_ms as u32);
        authenticate(&session, endpoint, credentials)?;
        debug!(username = %endpoint.username, alias = %endpoint.alias, "authenticated");

        Ok(Self {
            session,
            closed: false,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn close(mut self) {
        self.disconnect();
    }

    fn disconnect(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(error) = self.session.disconnect(None, "session finished", None) {
            warn!(%error, "failed to disconnect session cleanly");
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn connect_tcp(endpoint: &EndpointConfig, timeout: Duration) -> Result<TcpStream, ExecuteError> {
    let addrs = (endpoint.host.as_str(), endpoint.port)
        .to_socket_addrs()
        .map_err(|source| ExecuteError::Connect {
            host: endpoint.host.clone(),
            port: endpoint.port,
            source,
        })?
        .collect::<Vec<_>>();
    let mut last_error: Option<std::io::Error> = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(tcp) => return Ok(tcp),
            Err(source) => last_error = Some(source),
        }
    }
    let source = last_error.unwrap_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "host resolved to no addresses")
    });
    if source.kind() == std::io::ErrorKind::TimedOut {
        Err(ExecuteError::ConnectTimeout {
            host: endpoint.host.clone(),
            port: endpoint.port,
            timeout_ms: endpoint.connection_timeout_ms,
        })
    } else {
        Err(ExecuteError::Connect {
            host: endpoint.host.clone(),
            port: endpoint.port,
            source,
        })
    }
}

fn authenticate(
    session: &Session,
    endpoint: &EndpointConfig,
    credentials: &CredentialSelector,
) -> Result<(), ExecuteError> {
    let auth_error = |source: ssh2::Error| {
        if is_timeout(&source) {
            ExecuteError::AuthTimeout {
                username: endpoint.username.clone(),
                host: endpoint.host.clone(),
                timeout_ms: endpoint.auth_timeout_ms,
            }
        } else {
            ExecuteError::Auth {
                username: endpoint.username.clone(),
                host: endpoint.host.clone(),
                source,
            }
        }
    };

    if let Some(key_path) = credentials.key_for(&endpoint.alias) {
        session
            .userauth_pubkey_file(&endpoint.username, None, key_path, None)
            .map_err(auth_error)?;
    } else if let Some(password) = endpoint.password.as_deref() {
        session
            .userauth_password(&endpoint.username, password)
            .map_err(auth_error)?;
    }

    if session.authenticated() {
        Ok(())
    } else {
        Err(ExecuteError::Auth {
            username: endpoint.username.clone(),
            host: endpoint.host.clone(),
            source: ssh2::Error::from_errno(ssh2::ErrorCode::Session(
                LIBSSH2_ERROR_AUTHENTICATION_FAILED,
            )),
        })
    }
}
