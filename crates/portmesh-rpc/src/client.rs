//! Thin HTTP RPC client shared by the coordinator and every agent
//!
//! Per-call timeout is bounded; callers are expected to log and
//! continue rather than treat a timeout as fatal, matching the
//! "RPC transport failures are logged per call" error category.

use crate::messages::{
    AddEventRequest, Empty, ExecScanRequest, GetOpenPortsResponse, GetTrafficResponse,
    PollScanResponse, ScanStateResponse, SnitchStateResponse, StartMonitorRequest,
    StartSnitchRequest,
};
use portmesh_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::net::IpAddr;
use std::time::Duration;

/// Default per-RPC wait before giving up and logging the failure
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(5);

/// Reusable HTTP client for calling any agent's RPC endpoint
#[derive(Clone)]
pub struct RpcClient {
    http: reqwest::Client,
}

impl RpcClient {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_RPC_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client builder cannot fail with these settings");
        Self { http }
    }

    async fn call<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        ip: IpAddr,
        port: u16,
        method: &str,
        body: &Req,
    ) -> Result<Resp> {
        let url = format!("http://{ip}:{port}/{method}");
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| rpc_err(method, ip, port, e.to_string()))?;

        if !response.status().is_success() {
            return Err(rpc_err(
                method,
                ip,
                port,
                format!("HTTP {}", response.status()),
            ));
        }

        response
            .json::<Resp>()
            .await
            .map_err(|e| rpc_err(method, ip, port, format!("malformed response body: {e}")))
    }

    // ===== Scanner agent =====

    pub async fn exec_scan(&self, ip: IpAddr, port: u16, req: ExecScanRequest) -> Result<()> {
        let _: Empty = self.call(ip, port, "exec_scan", &req).await?;
        Ok(())
    }

    pub async fn stop_scan(&self, ip: IpAddr, port: u16) -> Result<()> {
        let _: Empty = self.call(ip, port, "stop_scan", &Empty {}).await?;
        Ok(())
    }

    pub async fn poll_scan(&self, ip: IpAddr, port: u16) -> Result<PollScanResponse> {
        self.call(ip, port, "poll_scan", &Empty {}).await
    }

    pub async fn scan_state(&self, ip: IpAddr, port: u16) -> Result<ScanStateResponse> {
        self.call(ip, port, "scan_state", &Empty {}).await
    }

    // ===== Firewall agent =====

    pub async fn start_snitch(&self, ip: IpAddr, port: u16, req: StartSnitchRequest) -> Result<()> {
        let _: Empty = self.call(ip, port, "start_snitch", &req).await?;
        Ok(())
    }

    pub async fn stop_snitch(&self, ip: IpAddr, port: u16) -> Result<()> {
        let _: Empty = self.call(ip, port, "stop_snitch", &Empty {}).await?;
        Ok(())
    }

    pub async fn snitch_state(&self, ip: IpAddr, port: u16) -> Result<SnitchStateResponse> {
        self.call(ip, port, "snitch_state", &Empty {}).await
    }

    // ===== Target agent =====

    pub async fn start_monitor(&self, ip: IpAddr, port: u16, req: StartMonitorRequest) -> Result<()> {
        let _: Empty = self.call(ip, port, "start_monitor", &req).await?;
        Ok(())
    }

    pub async fn stop_monitor(&self, ip: IpAddr, port: u16) -> Result<()> {
        let _: Empty = self.call(ip, port, "stop_monitor", &Empty {}).await?;
        Ok(())
    }

    pub async fn get_traffic(&self, ip: IpAddr, port: u16) -> Result<GetTrafficResponse> {
        self.call(ip, port, "get_traffic", &Empty {}).await
    }

    pub async fn get_open_ports(&self, ip: IpAddr, port: u16) -> Result<GetOpenPortsResponse> {
        self.call(ip, port, "get_open_ports", &Empty {}).await
    }

    // ===== Coordinator =====

    pub async fn add_event(&self, ip: IpAddr, port: u16, req: AddEventRequest) -> Result<()> {
        let _: Empty = self.call(ip, port, "add_event", &req).await?;
        Ok(())
    }
}

impl Default for RpcClient {
    fn default() -> Self {
        Self::new()
    }
}

fn rpc_err(method: &str, ip: IpAddr, port: u16, reason: String) -> Error {
    Error::Rpc {
        method: method.to_string(),
        peer: format!("{ip}:{port}"),
        reason,
    }
}
