//! ALSA capture via `arecord`.

use crate::capture::{AudioInputDevice, CaptureBackend, CaptureFormat};
use crate::error::{Result, ScribaError};
use async_trait::async_trait;
use regex::Regex;
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

// e.g. "card 1: Device [USB Audio Device], device 0: USB Audio [USB Audio]"
fn card_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^card\s+(\d+):\s+.*?\s+\[([^\]]+)\],\s+device\s+(\d+):\s+.*?\s+\[([^\]]+)\]")
            .unwrap_or_else(|e| {
                // A malformed literal pattern is a programming error.
                panic!("invalid device listing regex: {}", e)
            })
    })
}

fn parse_device_list(output: &str) -> Vec<AudioInputDevice> {
    let mut devices = Vec::new();
    for line in output.lines() {
        if let Some(caps) = card_line_regex().captures(line.trim()) {
            let card = &caps[1];
            let card_name = &caps[2];
            let dev = &caps[3];
            let dev_name = &caps[4];
            let id = format!("hw:{},{}", card, dev);
            devices.push(AudioInputDevice {
                name: format!("{} - {} ({})", card_name, dev_name, id),
                id,
            });
        }
    }
    devices
}

/// Capture backend that spawns `arecord` with raw output.
pub struct ArecordBackend {
    child: Option<Child>,
    reader: Option<JoinHandle<()>>,
    format: Option<CaptureFormat>,
}

impl ArecordBackend {
    pub fn new() -> Self {
        Self {
            child: None,
            reader: None,
            format: None,
        }
    }
}

impl Default for ArecordBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureBackend for ArecordBackend {
    async fn list_devices(&self) -> Vec<AudioInputDevice> {
        let output = match Command::new("arecord").arg("-l").output().await {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "could not run arecord -l");
                return Vec::new();
            }
        };
        if !output.status.success() {
            warn!(
                status = output.status.code().unwrap_or(-1),
                "arecord -l failed"
            );
            return Vec::new();
        }
        parse_device_list(&String::from_utf8_lossy(&output.stdout))
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

        let mut child = Command::new("arecord")
            .args([
                "-D", device_id, "-f", "S16_LE", "-r", "16000", "-c", "1", "-t", "raw",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ScribaError::Capture {
                message: format!("failed to start arecord for {}: {}", device_id, e),
            })?;

        let mut stdout = child.stdout.take().ok_or_else(|| ScribaError::Capture {
            message: "arecord stdout was not captured".to_string(),
        })?;

        debug!(device = device_id, "arecord capture started");

        let reader = tokio::spawn(async move {
            let mut buf = [0u8; 4096];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break; // consumer gone
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "arecord stream read failed");
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
                warn!(error = %e, "could not signal arecord to stop");
            }
            if let Err(e) = child.wait().await {
                warn!(error = %e, "waiting for arecord exit failed");
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
