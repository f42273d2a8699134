use crate::prelude::*;
use crate::error::ConnectionError;

use {
    async_trait::async_trait,
    bytes::{Buf, BufMut, BytesMut},
    std::io::ErrorKind,
    std::time::Duration,
    tokio::io::{AsyncReadExt, AsyncWriteExt},
    tokio::net::TcpStream,
};

const FUNCTION_READ_HOLDING: u8 = 0x03;
const MBAP_HEADER_LEN: usize = 7;

/// Obtains a block of raw 16-bit registers from the device. Trait seam so
/// the poll loop can run against a canned fetcher in tests.
#[async_trait]
pub trait RegisterFetcher {
    async fn fetch(&mut self, start: u16, count: u16) -> Result<RegisterBlock, ConnectionError>;
}

/// Minimal Modbus TCP client: MBAP framing around function 0x03, one
/// request in flight at a time. Reconnects on demand after any failure,
/// so a flapping inverter only costs the cycles it is actually down for.
pub struct ModbusClient {
    host: String,
    port: u16,
    unit_id: u8,
    timeout: Duration,
    stream: Option<TcpStream>,
    transaction_id: u16,
}

impl ModbusClient {
    pub fn new(host: String, port: u16, unit_id: u8, timeout_secs: u64) -> Self {
        Self {
            host,
            port,
            unit_id,
            timeout: Duration::from_secs(timeout_secs),
            stream: None,
            transaction_id: 0,
        }
    }

    fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn connect(&mut self) -> Result<&mut TcpStream, ConnectionError> {
        if self.stream.is_none() {
            info!("connecting to inverter at {}", self.addr());
            let stream = tokio::time::timeout(self.timeout, TcpStream::connect(self.addr()))
                .await
                .map_err(|_| ConnectionError::Timeout)?
                .map_err(|err| match err.kind() {
                    ErrorKind::ConnectionRefused => ConnectionError::Refused { addr: self.addr() },
                    _ => ConnectionError::SendReceive(err),
                })?;
            stream.set_nodelay(true)?;
            info!("connected to inverter at {}", self.addr());
            self.stream = Some(stream);
        }

        match self.stream.as_mut() {
            Some(stream) => Ok(stream),
            None => Err(ConnectionError::UnexpectedReply("no connection".to_string())),
        }
    }

    fn request_frame(&mut self, start: u16, count: u16) -> (u16, BytesMut) {
        self.transaction_id = self.transaction_id.wrapping_add(1);
        let transaction_id = self.transaction_id;

        let mut frame = BytesMut::with_capacity(12);
        frame.put_u16(transaction_id);
        frame.put_u16(0); // protocol identifier
        frame.put_u16(6); // remaining length: unit + function + address + count
        frame.put_u8(self.unit_id);
        frame.put_u8(FUNCTION_READ_HOLDING);
        frame.put_u16(start);
        frame.put_u16(count);

        (transaction_id, frame)
    }

    async fn exchange(&mut self, start: u16, count: u16) -> Result<RegisterBlock, ConnectionError> {
        let (transaction_id, frame) = self.request_frame(start, count);
        let timeout = self.timeout;
        let stream = self.connect().await?;

        tokio::time::timeout(timeout, stream.write_all(&frame))
            .await
            .map_err(|_| ConnectionError::Timeout)??;

        let mut header = [0u8; MBAP_HEADER_LEN];
        tokio::time::timeout(timeout, stream.read_exact(&mut header))
            .await
            .map_err(|_| ConnectionError::Timeout)??;

        let mut header = &header[..];
        let reply_transaction_id = header.get_u16();
        let _protocol_id = header.get_u16();
        let remaining = header.get_u16() as usize;
        let _unit_id = header.get_u8();

        if reply_transaction_id != transaction_id {
            return Err(ConnectionError::UnexpectedReply(format!(
                "transaction id {} does not match request {}",
                reply_transaction_id, transaction_id
            )));
        }
        if remaining < 2 {
            return Err(ConnectionError::UnexpectedReply(format!(
                "reply length {} too short for a PDU",
                remaining
            )));
        }

        let mut pdu = vec![0u8; remaining - 1];
        tokio::time::timeout(timeout, stream.read_exact(&mut pdu))
            .await
            .map_err(|_| ConnectionError::Timeout)??;

        if pdu.len() < 2 {
            return Err(ConnectionError::UnexpectedReply(format!(
                "truncated PDU of {} bytes",
                pdu.len()
            )));
        }

        let function = pdu[0];
        if function == FUNCTION_READ_HOLDING | 0x80 {
            return Err(ConnectionError::Exception(pdu[1]));
        }
        if function != FUNCTION_READ_HOLDING {
            return Err(ConnectionError::UnexpectedReply(format!(
                "unexpected function code {:#04x}",
                function
            )));
        }

        let byte_count = pdu[1] as usize;
        let payload = &pdu[2..];
        if byte_count != payload.len() || byte_count != count as usize * 2 {
            return Err(ConnectionError::UnexpectedReply(format!(
                "expected {} register bytes, got {}",
                count as usize * 2,
                payload.len()
            )));
        }

        let mut payload = payload;
        let mut registers = Vec::with_capacity(count as usize);
        while payload.remaining() >= 2 {
            registers.push(payload.get_u16());
        }

        Ok(RegisterBlock::new(registers))
    }
}

#[async_trait]
impl RegisterFetcher for ModbusClient {
    async fn fetch(&mut self, start: u16, count: u16) -> Result<RegisterBlock, ConnectionError> {
        let result = self.exchange(start, count).await;
        if result.is_err() {
            // force a reconnect on the next cycle
            self.stream = None;
        }
        result
    }
}
