use crate::consts::RDM_MAX_PARAMETER_DATA_LENGTH;
use crate::dmx_uart_hal::DmxUartError;

/// Parameter data of a single RDM frame.
pub type DataPack = heapless::Vec<u8, RDM_MAX_PARAMETER_DATA_LENGTH>;

/// Response status of an rdm package.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ResponseType {
    /// The request was acknowledged.
    Ack = 0x00,
    /// The request was acknowledged but the result isn't ready yet.
    AckTimer = 0x01,
    /// The request was not acknowledged.
    NackReason = 0x02,
    /// The request was acknowledged but the response does not fit into a
    /// single frame.
    AckOverflow = 0x03,
}

impl TryFrom<u8> for ResponseType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        Ok(match value {
            0x00 => Self::Ack,
            0x01 => Self::AckTimer,
            0x02 => Self::NackReason,
            0x03 => Self::AckOverflow,
            _ => return Err(()),
        })
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum NackReason {
    UnknownPid = 0x0000,
    FormatError = 0x0001,
    HardwareFault = 0x0002,
    ProxyReject = 0x0003,
    WriteProtect = 0x0004,
    UnsupportedCommandClass = 0x0005,
    DataOutOfRange = 0x0006,
    BufferFull = 0x0007,
    PacketSizeUnsupported = 0x0008,
    SubDeviceOutOfRange = 0x0009,
    ProxyBufferFull = 0x000A,
}

impl TryFrom<u16> for NackReason {
    type Error = ();

    /// Fails on manufacturer-specific reason codes (0x8000 and up) and
    /// reserved values; the raw code is still available from the ack.
    fn try_from(value: u16) -> Result<Self, ()> {
        match value {
            0x0000 => Ok(Self::UnknownPid),
            0x0001 => Ok(Self::FormatError),
            0x0002 => Ok(Self::HardwareFault),
            0x0003 => Ok(Self::ProxyReject),
            0x0004 => Ok(Self::WriteProtect),
            0x0005 => Ok(Self::UnsupportedCommandClass),
            0x0006 => Ok(Self::DataOutOfRange),
            0x0007 => Ok(Self::BufferFull),
            0x0008 => Ok(Self::PacketSizeUnsupported),
            0x0009 => Ok(Self::SubDeviceOutOfRange),
            0x000A => Ok(Self::ProxyBufferFull),
            _ => Err(()),
        }
    }
}

/// Typed outcome of one transaction on the bus. This is the vocabulary the
/// higher layers program against; the engine never retries on its own.
#[derive(Debug)]
pub enum RdmAck<E> {
    /// The request was a broadcast, so no response was solicited.
    NoResponse,
    /// A valid response arrived. `size` is the number of bytes received.
    Acknowledged {
        size: usize,
        parameter_data: DataPack,
    },
    /// The responder needs more time; retry after roughly `ticks`.
    AcknowledgedTimer { ticks: u32 },
    /// The responder refused the request with the given reason code.
    NotAcknowledged { reason: u16 },
    /// Part of a response that does not fit into a single frame. Re-issue
    /// the same request to collect the remainder.
    AcknowledgedOverflow { parameter_data: DataPack },
    /// Timeout, framing or checksum error, or a response that does not
    /// match the outstanding request. On broadcast discovery this is the
    /// usual shape of a collision.
    Invalid { fault: Option<DmxUartError<E>> },
}

impl<E> RdmAck<E> {
    /// The reason code interpreted against the ANSI E1.20 table, if this
    /// ack is a NACK with a standard code.
    pub fn nack_reason(&self) -> Option<NackReason> {
        match self {
            RdmAck::NotAcknowledged { reason } => NackReason::try_from(*reason).ok(),
            _ => None,
        }
    }
}
