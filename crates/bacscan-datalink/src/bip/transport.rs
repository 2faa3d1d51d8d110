use crate::bip::bvlc::{decode_frame, encode_frame, BVLC_HEADER_LEN};
use crate::{DataLink, DataLinkAddress, DataLinkError};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;

const MAX_BIP_FRAME_LEN: usize = 1600;

/// BACnet/IP over a tokio UDP socket. Clones share the socket.
#[derive(Debug, Clone)]
pub struct BacnetIpTransport {
    socket: Arc<UdpSocket>,
}

impl BacnetIpTransport {
    /// Largest NPDU one frame can carry.
    pub const MAX_NPDU_LEN: usize = MAX_BIP_FRAME_LEN - BVLC_HEADER_LEN;

    /// Binds a broadcast-enabled socket. Port 0 picks an ephemeral port.
    pub async fn bind(bind_addr: SocketAddr) -> Result<Self, DataLinkError> {
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.set_broadcast(true)?;
        log::debug!("bacnet/ip socket bound on {}", socket.local_addr()?);
        Ok(Self {
            socket: Arc::new(socket),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, DataLinkError> {
        Ok(self.socket.local_addr()?)
    }
}

impl DataLink for BacnetIpTransport {
    async fn send(&self, address: DataLinkAddress, payload: &[u8]) -> Result<(), DataLinkError> {
        let frame = encode_frame(address.is_broadcast(), payload, MAX_BIP_FRAME_LEN)?;
        self.socket.send_to(&frame, address.as_socket_addr()).await?;
        Ok(())
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<(usize, DataLinkAddress), DataLinkError> {
        let mut frame = [0u8; MAX_BIP_FRAME_LEN];
        let (n, sender) = self.socket.recv_from(&mut frame).await?;
        let (npdu, origin) = decode_frame(&frame[..n], sender)?;
        let out = buf
            .get_mut(..npdu.len())
            .ok_or(DataLinkError::FrameTooLarge)?;
        out.copy_from_slice(npdu);
        Ok((npdu.len(), DataLinkAddress::Ip(origin)))
    }
}
