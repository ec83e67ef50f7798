//! PulseAudio capture via `parec`, used on WSL where ALSA has no devices.

use crate::capture::{AudioInputDevice, CaptureBackend, CaptureFormat};
use crate::error::{Result, ScribaError};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

// `pactl list sources short` lines are tab-separated:
// index<TAB>name<TAB>driver<TAB>sample spec<TAB>state
fn parse_source_list(output: &str) -> Vec<AudioInputDevice> {
    let mut devices = Vec::new();
    for line in output.lines() {
        let mut fields = line.split('\t');
        let _index = fields.next();
        if let Some(name) = fields.next() {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            devices.push(AudioInputDevice {
                id: name.to_string(),
                name: name.to_string(),
            });
        }
    }
    devices
}

/// Capture backend that spawns `parec` with raw output.
pub struct PulseBackend {
    child: Option<Child>,
    reader: Option<JoinHandle<()>>,
    format: Option<CaptureFormat>,
}

impl PulseBackend {
    pub fn new() -> Self {
        Self {
            child: None,
            reader: None,
            format: None,
        }
    }
}

impl Default for PulseBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureBackend for PulseBackend {
    async fn list_devices(&self) -> Vec<AudioInputDevice> {
        let output = match Command::new("pactl")
            .args(["list", "sources", "short"])
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "could not run pactl");
                return Vec::new();
            }
        };
        if !output.status.success() {
            warn!(
                status = output.status.code().unwrap_or(-1),
                "pactl list sources failed"
            );
            return Vec::new();
        }
        parse_source_list(&String::from_utf8_lossy(&output.stdout))
    }

    async fn start_capture(
        &mut self,
        device_id: &str,
        format: CaptureFormat,
        tx: crossbeam_channel::Sender<Vec<u8>>,
    ) -> Result<()> {
        if self.child.is_some() {
            return Err(ScribaError::AlreadyCapturing);
        }
        if format != CaptureFormat::CANONICAL {
            return Err(ScribaError::UnsupportedFormat {
                requested: format!("{:?}", format),
            });
        }

        let mut child = Command::new("parec")
            .args([
                &format!("--device={}", device_id),
                "--format=s16le",
                "--rate=16000",
                "--channels=1",
                "--raw",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ScribaError::Capture {
                message: format!("failed to start parec for {}: {}", device_id, e),
            })?;

        let mut stdout = child.stdout.take().ok_or_else(|| ScribaError::Capture {
            message: "parec stdout was not captured".to_string(),
        })?;

        debug!(device = device_id, "parec capture started");

        let reader = tokio::spawn(async move {
            let mut buf = [0u8; 4096];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "parec stream read failed");
                        break;
                    }
                }
            }
        });

        self.child = Some(child);
        self.reader = Some(reader);
        self.format = Some(format);
        Ok(())
    }

    async fn stop_capture(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.start_kill() {
                warn!(error = %e, "could not signal parec to stop");
            }
            if let Err(e) = child.wait().await {
                warn!(error = %e, "waiting for parec exit failed");
            }
        }
        if let Some(reader) = self.reader.take()
            && let Err(e) = reader.await
        {
            warn!(error = %e, "capture reader task failed");
        }
        self.format = None;
    }

    fn current_format(&self) -> Option<CaptureFormat> {
        self.format
    }
}
