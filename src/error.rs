use thiserror::Error;

/// Transport-level failures reaching the inverter.
///
/// The first three variants are the failure modes the loop must be able to
/// tell apart in the logs: connection refused, timeout, and everything else
/// that surfaces as an I/O error mid-exchange.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("connection to inverter {addr} refused")]
    Refused { addr: String },

    #[error("timeout during send or receive operation")]
    Timeout,

    #[error("send or receive error: {0}")]
    SendReceive(#[from] std::io::Error),

    /// The inverter answered with a Modbus exception response.
    #[error("modbus exception response, code {0:#04x}")]
    Exception(u8),

    /// A reply that fails frame validation (bad transaction id, short
    /// payload, wrong register count).
    #[error("unexpected reply from inverter: {0}")]
    UnexpectedReply(String),
}

/// Structural failures while decoding a register block.
///
/// Field-local anomalies (sentinel readings, overflow on scaling) are not
/// errors; the decoder resolves them to absent fields and carries on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("register block too short: got {got} registers, need {need}")]
    MalformedBlock { got: usize, need: usize },

    #[error("cursor seek to byte {pos} outside block of {len} bytes")]
    OutOfRange { pos: i64, len: usize },
}
