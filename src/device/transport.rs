//! Feature-report transport for the D5 Next.
//!
//! The control path needs only a blocking request/response exchange of a
//! whole report, which is what [`Transport`] models. Sensor reports are pushed
//! by the device and delivered through [`TelemetryListener`] on its own
//! thread and its own device handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use hidapi::HidDevice;
use log::{debug, trace, warn};

use crate::error::{D5NextError, Result};
use crate::protocol::{SENSOR_REPORT_ID, SENSOR_REPORT_SIZE};

/// Direction of a feature-report exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportDirection {
    Get,
    Set,
}

/// Blocking feature-report exchange with the device.
pub trait Transport: Send {
    /// Exchange `buf` as report `report_id`.
    ///
    /// Byte 0 of `buf` carries the report id. For `Get` the device fills the
    /// buffer; for `Set` the buffer is sent as-is.
    ///
    /// # Returns
    /// Number of bytes transferred.
    fn request(&mut self, report_id: u8, direction: ReportDirection, buf: &mut [u8])
    -> Result<usize>;
}

// =============================================================================
// hidapi Transport
// =============================================================================

/// [`Transport`] over a hidapi device handle.
pub struct HidTransport {
    device: HidDevice,
}

impl HidTransport {
    pub fn new(device: HidDevice) -> Self {
        Self { device }
    }
}

impl Transport for HidTransport {
    fn request(
        &mut self,
        report_id: u8,
        direction: ReportDirection,
        buf: &mut [u8],
    ) -> Result<usize> {
        let failed = |e: hidapi::HidError| D5NextError::Transport {
            report_id,
            message: e.to_string(),
        };

        let Some(first) = buf.first_mut() else {
            return Err(D5NextError::Transport {
                report_id,
                message: "empty buffer".into(),
            });
        };
        *first = report_id;

        match direction {
            ReportDirection::Get => {
                let read = self.device.get_feature_report(buf).map_err(failed)?;
                trace!("GET report {:#04x}: {} bytes", report_id, read);
                Ok(read)
            }
            ReportDirection::Set => {
                self.device.send_feature_report(buf).map_err(failed)?;
                trace!("SET report {:#04x}: {} bytes", report_id, buf.len());
                Ok(buf.len())
            }
        }
    }
}

// =============================================================================
// Telemetry Listener
// =============================================================================

/// Background reader that hands every input report to a callback.
pub struct TelemetryListener {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TelemetryListener {
    /// Start reading input reports from `device`.
    ///
    /// # Arguments
    /// * `device` - Dedicated handle; the control path keeps its own
    /// * `read_timeout_ms` - How long each read blocks before checking for stop
    /// * `on_report` - Called with each raw report, report id at byte 0
    pub fn spawn<F>(device: HidDevice, read_timeout_ms: i32, mut on_report: F) -> Result<Self>
    where
        F: FnMut(&[u8]) + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();

        let handle = std::thread::Builder::new()
            .name("d5next-telemetry".into())
            .spawn(move || {
                let mut buf = [0u8; SENSOR_REPORT_SIZE];
                while r.load(Ordering::SeqCst) {
                    match device.read_timeout(&mut buf, read_timeout_ms) {
                        Ok(0) => continue,
                        Ok(n) => on_report(&buf[..n]),
                        Err(e) => {
                            warn!("Telemetry read failed, stopping listener: {}", e);
                            break;
                        }
                    }
                }
                debug!("Telemetry listener stopped");
            })
            .map_err(|e| D5NextError::Transport {
                report_id: SENSOR_REPORT_ID,
                message: format!("failed to start telemetry thread: {}", e),
            })?;

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Whether the reader thread is still running.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the reader and wait for it to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TelemetryListener {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Scripted Transport (tests)
// =============================================================================

#[cfg(test)]
pub(crate) mod mock {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;

    /// One recorded exchange.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) struct Request {
        pub report_id: u8,
        pub direction: ReportDirection,
        pub data: Vec<u8>,
    }

    /// Transport that answers `Get` with a fixed report and records everything.
    #[derive(Clone)]
    pub(crate) struct ScriptedTransport {
        pub report: Vec<u8>,
        pub fail_on: Option<(u8, ReportDirection)>,
        /// Time spent in every exchange.
        pub delay: Option<Duration>,
        pub requests: Arc<Mutex<Vec<Request>>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(report: &[u8]) -> Self {
            Self {
                report: report.to_vec(),
                fail_on: None,
                delay: None,
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub(crate) fn failing(mut self, report_id: u8, direction: ReportDirection) -> Self {
            self.fail_on = Some((report_id, direction));
            self
        }

        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub(crate) fn requests(&self) -> Vec<Request> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Transport for ScriptedTransport {
        fn request(
            &mut self,
            report_id: u8,
            direction: ReportDirection,
            buf: &mut [u8],
        ) -> Result<usize> {
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            if direction == ReportDirection::Get {
                let n = self.report.len().min(buf.len());
                buf[..n].copy_from_slice(&self.report[..n]);
            }
            self.requests.lock().unwrap().push(Request {
                report_id,
                direction,
                data: buf.to_vec(),
            });
            if self.fail_on == Some((report_id, direction)) {
                return Err(D5NextError::Transport {
                    report_id,
                    message: "scripted failure".into(),
                });
            }
            if direction == ReportDirection::Set && report_id == crate::protocol::CONTROL_REPORT_ID
            {
                self.report = buf.to_vec();
            }
            Ok(match direction {
                ReportDirection::Get => self.report.len().min(buf.len()),
                ReportDirection::Set => buf.len(),
            })
        }
    }
}
