pub const DMX_NULL_START: u8 = 0x00;
/// start code + 512 slot bytes
pub const DMX_MAX_PACKAGE_SIZE: usize = 513;
pub const SC_RDM: u8 = 0xCC;
pub const SC_SUB_MESSAGE: u8 = 0x01;

pub const PREAMBLE_BYTE: u8 = 0xFE;
pub const SEPARATOR_BYTE: u8 = 0xAA;

pub const DMX_BAUD: u32 = 250_000;

pub const BREAK_MICROS: u64 = 200;
pub const MAB_MICROS: u64 = 48;

/// Serialized header including start code, sub start code and message
/// length, up to but excluding the pdl slot.
pub const RDM_HEADER_SIZE: usize = 23;
/// Offset of the pdl slot within an RDM frame.
pub const RDM_PDL_OFFSET: usize = 23;
/// Offset of the first parameter data slot within an RDM frame.
pub const RDM_PD_OFFSET: usize = 24;
/// Message length of an RDM frame with no parameter data (start code
/// through the pdl slot inclusive).
pub const RDM_BASE_MESSAGE_LENGTH: usize = 24;

/// Frame with zero-length parameter data, checksum included.
pub const RDM_MIN_PACKAGE_SIZE: usize = 26;
pub const RDM_MAX_PACKAGE_SIZE: usize = 257;
pub const RDM_MAX_PARAMETER_DATA_LENGTH: usize = 231;

/// Excluding preamble and separator.
pub const RDM_DISCOVERY_RESPONSE_SIZE: usize = 16;
/// Including 7 bytes preamble + 1 byte separator.
pub const RDM_MAX_DISCOVERY_RESPONSE_SIZE: usize = RDM_DISCOVERY_RESPONSE_SIZE + 8;

pub const RDM_DEVICE_INFO_SIZE: usize = 0x13;

pub const SUB_DEVICE_ROOT: u16 = 0x0000;
pub const SUB_DEVICE_ALL: u16 = 0xFFFF;

/// Scheduler ticks granted to a responder turnaround before the receive
/// path reports a timeout.
pub const RDM_RESPONSE_TIMEOUT_TICKS: u32 = 2;
/// Scheduler ticks granted to the transmitter to drain a broadcast frame.
pub const RDM_SEND_TIMEOUT_TICKS: u32 = 2;
