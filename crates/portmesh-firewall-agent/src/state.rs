//! Shared state for one firewall (log snitch) agent process.

use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use portmesh_core::{Alert, Event};
use portmesh_rpc::messages::{AddEventRequest, SnitchStateResponse, StartSnitchRequest};
use portmesh_rpc::RpcClient;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::snitch;

pub struct SnitchState {
    own_ip: IpAddr,
    alerts: Mutex<Vec<Alert>>,
    active: Arc<AtomicBool>,
}

impl SnitchState {
    pub fn new(own_ip: IpAddr) -> Arc<Self> {
        Arc::new(Self {
            own_ip,
            alerts: Mutex::new(Vec::new()),
            active: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn snitch_state(&self) -> SnitchStateResponse {
        SnitchStateResponse {
            alerts: self.alerts.lock().clone(),
        }
    }

    pub fn stop_snitch(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn start_snitch(self: &Arc<Self>, req: StartSnitchRequest) {
        *self.alerts.lock() = Vec::new();
        self.active.store(true, Ordering::SeqCst);

        let state = Arc::clone(self);
        tokio::spawn(async move {
            state.run_loop(req).await;
        });
    }

    async fn run_loop(&self, req: StartSnitchRequest) {
        let mut file = match tokio::fs::File::open(&req.logfile).await {
            Ok(file) => file,
            Err(err) => {
                tracing::warn!(logfile = %req.logfile, error = %err, "failed to open IDS log");
                self.active.store(false, Ordering::SeqCst);
                return;
            }
        };

        let mut position = match file.seek(std::io::SeekFrom::End(0)).await {
            Ok(pos) => pos,
            Err(err) => {
                tracing::warn!(error = %err, "failed to seek IDS log to EOF");
                self.active.store(false, Ordering::SeqCst);
                return;
            }
        };

        let interval = Duration::from_secs_f64(req.interval_secs.max(0.0));

        while self.active.load(Ordering::SeqCst) {
            match tokio::fs::metadata(&req.logfile).await {
                Ok(meta) if meta.len() > position => {
                    let mut buf = Vec::new();
                    if file.read_to_end(&mut buf).await.is_ok() {
                        position += buf.len() as u64;
                        let text = String::from_utf8_lossy(&buf);
                        self.process_chunk(&text, &req).await;
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(error = %err, "could not stat IDS log");
                }
            }

            tokio::time::sleep(interval).await;
        }
    }

    async fn process_chunk(&self, text: &str, req: &StartSnitchRequest) {
        let alerts = snitch::parse_alerts(text, &req.patterns, self.own_ip);
        if alerts.is_empty() {
            return;
        }

        self.alerts.lock().extend(alerts.clone());

        let Some(coordinator) = req.coordinator else {
            return;
        };
        let client = RpcClient::new();
        for alert in alerts {
            let event = Event::Firewall { alert };
            if let Err(err) = client
                .add_event(coordinator.ip, coordinator.port, AddEventRequest { event })
                .await
            {
                tracing::warn!(error = %err, "failed to deliver firewall-detection event");
            }
        }
    }
}
