//! Locating and opening the voice client's IPC endpoint

use std::path::PathBuf;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{Result, RpcError};

/// Number of IPC slots the voice client may listen on
pub const PIPE_SLOTS: u8 = 10;

/// Anything that can carry IPC frames
pub trait IpcStream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> IpcStream for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

fn slots(pipe: Option<u8>) -> Vec<u8> {
    match pipe {
        Some(n) => vec![n],
        None => (0..PIPE_SLOTS).collect(),
    }
}

/// Socket paths to try, in order, below the given base directories
///
/// Sandboxed installs (Flatpak, Snap) put the socket in a subdirectory of the
/// runtime dir, so each base is tried plain and with those suffixes.
pub fn candidate_paths_in(bases: &[PathBuf], pipe: Option<u8>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for base in bases {
        for sub in ["", "app/com.discordapp.Discord", "snap.discord"] {
            let dir = if sub.is_empty() { base.clone() } else { base.join(sub) };
            for n in slots(pipe) {
                let path = dir.join(format!("discord-ipc-{}", n));
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
    }
    paths
}

#[cfg(unix)]
fn base_dirs() -> Vec<PathBuf> {
    let mut bases: Vec<PathBuf> = ["XDG_RUNTIME_DIR", "TMPDIR", "TMP", "TEMP"]
        .iter()
        .filter_map(|var| std::env::var_os(var))
        .map(PathBuf::from)
        .collect();
    bases.push(PathBuf::from("/tmp"));
    bases.dedup();
    bases
}

/// Candidate endpoints for this platform
#[cfg(unix)]
pub fn candidate_paths(pipe: Option<u8>) -> Vec<PathBuf> {
    candidate_paths_in(&base_dirs(), pipe)
}

/// Candidate endpoints for this platform
#[cfg(windows)]
pub fn candidate_paths(pipe: Option<u8>) -> Vec<PathBuf> {
    slots(pipe)
        .into_iter()
        .map(|n| PathBuf::from(format!(r"\\?\pipe\discord-ipc-{}", n)))
        .collect()
}

#[cfg(unix)]
async fn open_path(path: &std::path::Path) -> std::io::Result<Box<dyn IpcStream>> {
    let stream = tokio::net::UnixStream::connect(path).await?;
    Ok(Box::new(stream))
}

#[cfg(windows)]
async fn open_path(path: &std::path::Path) -> std::io::Result<Box<dyn IpcStream>> {
    let client = tokio::net::windows::named_pipe::ClientOptions::new().open(path)?;
    Ok(Box::new(client))
}

/// Open the first endpoint that accepts a connection
pub async fn open(pipe: Option<u8>) -> Result<Box<dyn IpcStream>> {
    let mut last_error = None;

    for path in candidate_paths(pipe) {
        match open_path(&path).await {
            Ok(stream) => {
                tracing::debug!("Connected to voice client IPC at {}", path.display());
                return Ok(stream);
            }
            Err(e) => {
                tracing::trace!("IPC endpoint {} unavailable: {}", path.display(), e);
                last_error = Some(e);
            }
        }
    }

    Err(match last_error {
        Some(e) => RpcError::Io(e),
        None => RpcError::Protocol("no IPC endpoint candidates".to_string()),
    })
}
