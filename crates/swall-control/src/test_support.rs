//! In-process stand-in for the compositor's control socket
//!
//! Speaks the same wire protocol as the real compositor and keeps a pid
//! table, so client round trips can be tested without a Wayland session.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinHandle;

use crate::codec::{FrameCodec, FRAME_DELIMITER};
use crate::{AppConfig, Command};

pub(crate) const SCREEN_SIZE: (u32, u32) = (3840, 2160);
const FIRST_PID: u32 = 4000;

#[derive(Debug, Default)]
struct ProcessTable {
    next_pid: u32,
    processes: Vec<(u32, AppConfig)>,
}

pub(crate) struct MockCompositor {
    socket_path: PathBuf,
    accept_task: JoinHandle<()>,
    _dir: TempDir,
}

impl MockCompositor {
    pub(crate) async fn start() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let socket_path = dir.path().join("control-0");
        let listener = UnixListener::bind(&socket_path)?;

        let table = Arc::new(Mutex::new(ProcessTable {
            next_pid: FIRST_PID,
            processes: Vec::new(),
        }));

        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _addr)) = listener.accept().await {
                let table = Arc::clone(&table);
                tokio::spawn(async move {
                    if let Err(e) = serve(stream, table).await {
                        tracing::debug!("mock compositor connection ended: {e}");
                    }
                });
            }
        });

        Ok(Self {
            socket_path,
            accept_task,
            _dir: dir,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for MockCompositor {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn serve(stream: UnixStream, table: Arc<Mutex<ProcessTable>>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut segments = BufReader::new(reader).split(FRAME_DELIMITER);

    while let Some(segment) = segments.next_segment().await? {
        let response = process(&segment, &table);
        writer.write_all(&FrameCodec::encode(&response)?).await?;
    }

    Ok(())
}

fn response(success: bool) -> Value {
    json!({
        "success": success,
        "pid": null,
        "screen_width": null,
        "screen_height": null,
        "config": null,
        "process_ids": null,
        "error": null,
    })
}

fn failure(message: String) -> Value {
    let mut value = response(false);
    value["error"] = json!(message);
    value
}

fn process(segment: &[u8], table: &Mutex<ProcessTable>) -> Value {
    let command: Command = match serde_json::from_slice(segment) {
        Ok(command) => command,
        Err(e) => return failure(e.to_string()),
    };

    let mut table = table.lock().unwrap();
    match command {
        Command::Spawn { config } => {
            let pid = table.next_pid;
            table.next_pid += 1;
            table.processes.push((pid, config.clone()));

            let mut value = response(true);
            value["pid"] = json!(pid);
            value["config"] = json!(config);
            value
        }
        Command::Kill { pid } => match table.processes.iter().position(|(p, _)| *p == pid) {
            Some(index) => {
                table.processes.remove(index);
                let mut value = response(true);
                value["pid"] = json!(pid);
                value
            }
            None => failure(format!("pid {pid} not found")),
        },
        Command::List => {
            let mut value = response(true);
            value["process_ids"] = json!(table.processes);
            value
        }
        Command::ScreenSize => {
            let mut value = response(true);
            value["screen_width"] = json!(SCREEN_SIZE.0);
            value["screen_height"] = json!(SCREEN_SIZE.1);
            value
        }
        Command::Move { pid, rect } => {
            match table.processes.iter_mut().find(|(p, _)| *p == pid) {
                Some((_, config)) => {
                    config.area = rect;
                    let mut value = response(true);
                    value["pid"] = json!(pid);
                    value
                }
                None => failure(format!("Unknown pid {pid}")),
            }
        }
    }
}
