//! Script retrieval over SCP into an in-memory buffer.

use std::io::Read;
use std::path::Path;

use ssh2::Session;
use tracing::debug;

use crate::error::ExecuteError;

/// Downloads the script at `path` from the remote host. Any transfer error,
/// including one observed while draining the channel after the bytes nominally
/// arrived, fails the fetch.
pub fn fetch_script(session: &Session, path: &str) -> Result<String, ExecuteError> {
    let transfer_error = |source: ssh2::Error| ExecuteError::ScriptTransfer {
        path: path.to_string(),
        source: source.into(),
    };

    let (mut channel, stat) = session
        .scp_recv(Path::new(path))
        .map_err(transfer_error)?;
    debug!(path = %path, size = stat.size(), "transferring script");

    let mut contents = Vec::with_capacity(stat.size() as usize);
    channel
        .read_to_end(&mut contents)
        .map_err(|source| ExecuteError::ScriptTransfer {
            path: path.to_string(),
            source,
        })?;

    channel.send_eof().map_err(transfer_error)?;
    channel.wait_eof().map_err(transfer_error)?;
    channel.close().map_err(transfer_error)?;
    channel.wait_close().map_err(transfer_error)?;

    Ok(String::from_utf8_lossy(&contents).into_owned())
}
