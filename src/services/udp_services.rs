use std::{net::Ipv4Addr, time::Duration};

use tokio::time::Instant;
use tracing::debug;

use crate::{
    config::SimulatorConfig,
    net::{udp_transceiver::UdpTransceiver, CreationError},
    sim_protocol::{
        service_request::Call, service_response::Outcome, ListServices, ServiceRequest,
        ServiceResponse,
    },
};

use super::{SimulatorTransport, TransportError};

/// Simulator services over udp. Responses are matched to requests by id, anything else is dropped.
pub struct UdpServiceClient {
    socket: UdpTransceiver,
    next_request_id: u32,
    query_timeout: Duration,
    response_timeout: Option<Duration>,
}

impl UdpServiceClient {
    pub async fn new(
        ip: Ipv4Addr,
        port: u16,
        query_timeout: Duration,
        response_timeout: Option<Duration>,
    ) -> Result<Self, CreationError> {
        Ok(Self {
            socket: UdpTransceiver::new(ip, port).await?,
            next_request_id: 0,
            query_timeout,
            response_timeout,
        })
    }

    pub async fn from_config(config: &SimulatorConfig) -> Result<Self, CreationError> {
        Self::new(
            config.ip,
            config.service_port,
            config.availability_query_timeout(),
            config.response_timeout(),
        )
        .await
    }

    async fn exchange(
        &mut self,
        call: Call,
        timeout: Option<Duration>,
    ) -> Result<Outcome, TransportError> {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        self.socket
            .send(&ServiceRequest {
                request_id,
                call: Some(call),
            })
            .await?;

        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        loop {
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            let response = self
                .socket
                .receive_within::<ServiceResponse>(remaining)
                .await?;
            if response.request_id != request_id {
                debug!(
                    expected = request_id,
                    received = response.request_id,
                    "dropping stale response"
                );
                continue;
            }
            return response.outcome.ok_or(TransportError::EmptyResponse);
        }
    }
}

impl SimulatorTransport for UdpServiceClient {
    async fn list_services(&mut self) -> Result<Vec<String>, TransportError> {
        match self
            .exchange(Call::ListServices(ListServices {}), Some(self.query_timeout))
            .await?
        {
            Outcome::Services(list) => Ok(list.names),
            other => {
                debug!("unexpected reply to a services query: {:?}", other);
                Ok(Vec::new())
            }
        }
    }

    async fn call(&mut self, call: Call) -> Result<Outcome, TransportError> {
        self.exchange(call, self.response_timeout).await
    }
}
