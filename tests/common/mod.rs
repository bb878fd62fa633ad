// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::sleep;

use anvesha::listener::{FlowListener, IngestEvent};

pub fn make_temp_path(tag: &str, ext: &str) -> PathBuf {
    std::env::temp_dir().join(format!("anvesha_integ_{}_{}.{}", tag, uuid::Uuid::new_v4(), ext))
}

pub fn make_temp_socket_path(tag: &str) -> PathBuf {
    let id = uuid::Uuid::new_v4().simple().to_string();
    std::env::temp_dir().join(format!("anv_it_{}_{}.sock", tag, &id[..12]))
}

// Start a listener and wait until the socket accepts connections
pub async fn start_listener_and_wait(
    path: &Path,
    events: UnboundedSender<IngestEvent>,
) -> anyhow::Result<FlowListener> {
    let mut listener = FlowListener::new(path);
    listener.start(events)?;

    let deadline = Instant::now() + Duration::from_secs(5);
    while !path.exists() {
        if Instant::now() > deadline {
            return Err(anyhow::anyhow!("timeout waiting for listener socket"));
        }
        sleep(Duration::from_millis(20)).await;
    }
    Ok(listener)
}

// Write one payload as the capture add-on does: connect, write all, close
pub async fn send_payload(path: &Path, payload: &str) -> anyhow::Result<()> {
    let mut stream = UnixStream::connect(path).await?;
    stream.write_all(payload.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}
