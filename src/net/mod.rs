// https://stackoverflow.com/questions/77590001/can-i-convert-from-socket2socket-to-tokionettcpstream

use prost::{DecodeError, EncodeError};
use std::io;
use thiserror::Error;

pub mod udp_responder;
pub mod udp_transceiver;

/// largest udp payload over ipv4
const BUFFER_SIZE: usize = 65_507;

#[derive(Debug, Error)]
pub enum ReceiveError {
    #[error("couldn't receive from socket: {0}")]
    SocketReceiveError(io::Error),
    #[error("couldn't decode packet: {0}")]
    DecodeError(DecodeError),
    #[error("no packet received in time")]
    Timeout,
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("couldn't send on socket: {0}")]
    SocketSendError(io::Error),
    #[error("couldn't encode packet: {0}")]
    EncodeError(EncodeError),
}

#[derive(Debug, Error)]
pub enum CreationError {
    #[error("couldn't create socket: {0}")]
    SocketCreationError(io::Error),
    #[error("couldn't set SO_REUSEADDR: {0}")]
    SocketReuseAddressError(io::Error),
    #[error("couldn't make socket nonblocking: {0}")]
    SocketNonblockingError(io::Error),
    #[error("couldn't bind socket: {0}")]
    SocketBindError(io::Error),
    #[error("couldn't connect socket: {0}")]
    SocketConnectError(io::Error),
    #[error("couldn't hand socket over to tokio: {0}")]
    SocketRegisterError(io::Error),
}
