//! Downloads a URL to a local path, honoring an optional proxy.
//!
//! This is the toolbox's only network touchpoint. Blocking by design: an
//! install waits for its download, and a failed download fails the run.

use crate::log_debug;
use colored::Colorize;
use std::fs::File;
use std::io;
use std::path::Path;

/// Streams `url` into `dest`, creating or truncating the file. `proxy` is a
/// full proxy URL (e.g. `http://proxy:3128`) or `None` for a direct
/// connection. Errors are plain `io::Error`s; callers wrap them with the
/// failing tool's context.
pub fn download_file(url: &str, dest: &Path, proxy: Option<&str>) -> io::Result<()> {
    log_debug!(
        "Downloading {} -> {}{}",
        url.blue(),
        dest.display().to_string().cyan(),
        proxy.map(|p| format!(" (proxy {p})")).unwrap_or_default()
    );

    let mut builder = ureq::AgentBuilder::new();
    if let Some(addr) = proxy {
        let proxy = ureq::Proxy::new(addr)
            .map_err(|e| io::Error::other(format!("invalid proxy {addr}: {e}")))?;
        builder = builder.proxy(proxy);
    }
    let agent = builder.build();

    let response = agent
        .get(url)
        .call()
        .map_err(|e| io::Error::other(format!("HTTP error for {url}: {e}")))?;

    let mut file = File::create(dest)?;
    let mut reader = response.into_reader();
    io::copy(&mut reader, &mut file)?;

    log_debug!("Downloaded {}", dest.display().to_string().green());
    Ok(())
}
