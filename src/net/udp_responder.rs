use super::{CreationError, ReceiveError, SendError, BUFFER_SIZE};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket as StdUdpSocket};
use tokio::net::UdpSocket as TokioUdpSocket;
use CreationError::*; // for readability in `UdpResponder::new`

/// Server side of the simulator protocol: receives packets from any peer and answers to the sender.
pub struct UdpResponder {
    socket: TokioUdpSocket,
    buffer: Vec<u8>,
}

impl UdpResponder {
    pub fn new(ip: Ipv4Addr, port: u16) -> Result<Self, CreationError> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
            .map_err(SocketCreationError)?;
        socket
            .set_reuse_address(true)
            .map_err(SocketReuseAddressError)?;
        socket
            .set_nonblocking(true)
            .map_err(SocketNonblockingError)?;
        socket
            .bind(&SocketAddrV4::new(ip, port).into())
            .map_err(SocketBindError)?;
        let std_socket: StdUdpSocket = socket.into();
        Ok(Self {
            socket: TokioUdpSocket::from_std(std_socket).map_err(SocketRegisterError)?,
            buffer: vec![0u8; BUFFER_SIZE],
        })
    }

    /// The address actually bound, useful when binding port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub async fn receive<T: prost::Message + Default>(
        &mut self,
    ) -> Result<(T, SocketAddr), ReceiveError> {
        let (received_bytes_count, peer) = self
            .socket
            .recv_from(&mut self.buffer)
            .await
            .map_err(ReceiveError::SocketReceiveError)?;
        let packet = T::decode(&self.buffer[0..received_bytes_count])
            .map_err(ReceiveError::DecodeError)?;
        Ok((packet, peer))
    }

    pub async fn reply<T: prost::Message>(
        &self,
        packet: &T,
        peer: SocketAddr,
    ) -> Result<usize, SendError> {
        let mut buf = Vec::with_capacity(packet.encoded_len());
        packet.encode(&mut buf).map_err(SendError::EncodeError)?;
        self.socket
            .send_to(&buf, peer)
            .await
            .map_err(SendError::SocketSendError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        net::udp_transceiver::UdpTransceiver,
        sim_protocol::{
            service_request::Call, service_response::Outcome, ListServices, ServiceList,
            ServiceRequest, ServiceResponse,
        },
    };

    #[tokio::test]
    async fn service_list_larger_than_a_kilobyte_goes_through() {
        let mut responder = UdpResponder::new(Ipv4Addr::LOCALHOST, 0).unwrap();
        let port = responder.local_addr().unwrap().port();
        let mut client = UdpTransceiver::new(Ipv4Addr::LOCALHOST, port).await.unwrap();

        let request = ServiceRequest {
            request_id: 7,
            call: Some(Call::ListServices(ListServices {})),
        };
        client.send(&request).await.unwrap();
        let (received, peer) = responder.receive::<ServiceRequest>().await.unwrap();
        assert_eq!(received, request);

        let names: Vec<String> = (1..=600).map(|i| format!("turtle{i}/set_pen")).collect();
        let response = ServiceResponse {
            request_id: 7,
            outcome: Some(Outcome::Services(ServiceList { names })),
        };
        let sent = responder.reply(&response, peer).await.unwrap();
        assert!(sent > 1024);

        let answer: ServiceResponse = client.receive().await.unwrap();
        assert_eq!(answer, response);
    }
}
