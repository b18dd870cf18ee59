use super::{CreationError, ReceiveError, SendError, BUFFER_SIZE};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;
use tokio::net::UdpSocket;

/// A udp socket connected to a single peer, speaking protobuf.
pub struct UdpTransceiver {
    socket: UdpSocket,
    buffer: Vec<u8>,
}

impl UdpTransceiver {
    pub async fn new(ip: Ipv4Addr, port: u16) -> Result<Self, CreationError> {
        let socket = UdpSocket::bind(SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 0))
            .await
            .map_err(CreationError::SocketBindError)?;
        socket
            .connect(SocketAddrV4::new(ip, port))
            .await
            .map_err(CreationError::SocketConnectError)?;
        let buffer = vec![0u8; BUFFER_SIZE];

        Ok(Self { socket, buffer })
    }

    pub async fn send<T: prost::Message>(&self, packet: &T) -> Result<usize, SendError> {
        let mut buf = Vec::with_capacity(packet.encoded_len());
        packet.encode(&mut buf).map_err(SendError::EncodeError)?;
        self.socket
            .send(&buf)
            .await
            .map_err(SendError::SocketSendError)
    }

    pub async fn receive<T: prost::Message + Default>(&mut self) -> Result<T, ReceiveError> {
        let received_bytes_count = self
            .socket
            .recv(&mut self.buffer)
            .await
            .map_err(ReceiveError::SocketReceiveError)?;
        T::decode(&self.buffer[0..received_bytes_count])
            .map_err(ReceiveError::DecodeError)
    }

    /// Same as [`UdpTransceiver::receive`], giving up after `timeout` when there is one.
    pub async fn receive_within<T: prost::Message + Default>(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<T, ReceiveError> {
        match timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.receive::<T>())
                .await
                .unwrap_or(Err(ReceiveError::Timeout)),
            None => self.receive::<T>().await,
        }
    }
}
