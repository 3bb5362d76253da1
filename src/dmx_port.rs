use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use embassy_sync::blocking_mutex::Mutex;

use crate::consts::{
    DMX_MAX_PACKAGE_SIZE, RDM_BASE_MESSAGE_LENGTH, RDM_HEADER_SIZE, RDM_MAX_PACKAGE_SIZE,
    RDM_MAX_PARAMETER_DATA_LENGTH, RDM_PDL_OFFSET, RDM_PD_OFFSET, SC_RDM, SC_SUB_MESSAGE,
};
use crate::dmx_uart_hal::{Direction, DmxUartHal};
use crate::rdm_header::RdmHeader;
use crate::types::DataPack;
use crate::unique_identifier::Uid;
use crate::utils::calculate_checksum;

#[derive(Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameWriteError {
    /// A transmission is already in flight on this port.
    SendInProgress,
    /// Parameter data must be at most 231 bytes.
    ParameterDataTooLong,
}

impl core::fmt::Display for FrameWriteError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FrameWriteError::SendInProgress => write!(f, "send already in progress"),
            FrameWriteError::ParameterDataTooLong => write!(f, "parameter data too long"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FrameWriteError {}

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RdmDeserializationError {
    /// Received wrong start code (0xCC) or sub start code (0x01).
    WrongStartCode,
    /// The message length field is out of range; contains result of parsing.
    WrongMessageLength(usize),
    /// The frame checksum does not add up.
    WrongChecksum,
    /// The command class was not found; contains contents of the field.
    CommandClassNotFound(u8),
}

impl core::fmt::Display for RdmDeserializationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RdmDeserializationError::WrongStartCode => write!(f, "start code is incorrect"),
            RdmDeserializationError::WrongMessageLength(message_length) => {
                write!(f, "message length {} is incorrect", message_length)
            },
            RdmDeserializationError::WrongChecksum => write!(f, "checksum is incorrect"),
            RdmDeserializationError::CommandClassNotFound(command_class) => {
                write!(f, "command class {} not found", command_class)
            },
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RdmDeserializationError {}

/// The mutable bus state of one port. The slot buffer is shared between
/// the transmit and receive paths, which is why a response can only be
/// validated against a copy of the request, never against the buffer.
pub(crate) struct BusState {
    pub(crate) buffer: [u8; DMX_MAX_PACKAGE_SIZE],
    pub(crate) tx_size: usize,
    pub(crate) is_sending: bool,
    pub(crate) transaction_number: u8,
}

impl BusState {
    const fn new() -> Self {
        Self {
            buffer: [0; DMX_MAX_PACKAGE_SIZE],
            tx_size: 0,
            is_sending: false,
            transaction_number: 0,
        }
    }
}

#[derive(Debug)]
pub struct DmxPortConfig {
    /// The uid this port claims as the source of its requests.
    pub uid: Uid,
    /// Zero-based index of the port; requests carry `port_number + 1` when
    /// the caller leaves the port id blank.
    pub port_number: u8,
}

impl Default for DmxPortConfig {
    fn default() -> Self {
        Self {
            uid: Uid::new(0x7FF0, 0), // prototyping id
            port_number: 0,
        }
    }
}

/// One independent DMX/RDM port: the uart driver plus the bus state behind
/// a critical section.
///
/// The mutex kind mirrors the scheduling environment. The default masks
/// interrupts, which is required when the uart driver's interrupt handlers
/// share state with the port; tests and single-threaded hosts can use
/// `NoopRawMutex`.
pub struct DmxPort<D, M: RawMutex = CriticalSectionRawMutex> {
    pub(crate) hal: D,
    pub(crate) state: Mutex<M, RefCell<BusState>>,
    pub(crate) uid: Uid,
    pub(crate) port_number: u8,
}

impl<D: DmxUartHal, M: RawMutex> DmxPort<D, M> {
    pub fn new(hal: D, config: DmxPortConfig) -> Self {
        Self {
            hal,
            state: Mutex::new(RefCell::new(BusState::new())),
            uid: config.uid,
            port_number: config.port_number,
        }
    }

    /// The uid this port claims as a request source.
    pub fn uid(&self) -> Uid {
        self.uid
    }

    /// Get a reference to the underlying driver.
    pub fn get_driver(&mut self) -> &mut D {
        &mut self.hal
    }

    /// Serializes a frame into the port buffer: header, parameter data,
    /// message length and checksum. Fails fast while a transmission is in
    /// flight. Returns the frame size including the checksum.
    pub fn write(
        &mut self,
        header: &RdmHeader,
        parameter_data: &[u8],
    ) -> Result<usize, FrameWriteError> {
        if parameter_data.len() > RDM_MAX_PARAMETER_DATA_LENGTH {
            return Err(FrameWriteError::ParameterDataTooLong);
        }

        let Self { hal, state, .. } = self;
        state.lock(|cell| {
            let mut bus = cell.borrow_mut();
            if bus.is_sending {
                return Err(FrameWriteError::SendInProgress);
            }
            if hal.rts() == Direction::Inbound {
                // Stops the frame under construction from being clobbered
                // by inbound slots.
                hal.set_rts(Direction::Outbound);
            }

            RdmHeader::format_program().emplace(&mut bus.buffer, &header.to_image(), false);

            let pdl = parameter_data.len();
            bus.buffer[RDM_PDL_OFFSET] = pdl as u8;
            bus.buffer[RDM_PD_OFFSET..RDM_PD_OFFSET + pdl].copy_from_slice(parameter_data);

            let message_length = RDM_BASE_MESSAGE_LENGTH + pdl;
            bus.buffer[2] = message_length as u8;

            let checksum = calculate_checksum(&bus.buffer[..message_length]);
            bus.buffer[message_length..message_length + 2]
                .copy_from_slice(&checksum.to_be_bytes());

            bus.tx_size = message_length + 2;
            Ok(bus.tx_size)
        })
    }

    /// Validates and deserializes the frame currently in the port buffer.
    /// Returns the header and its parameter data.
    pub fn read(&self) -> Result<(RdmHeader, DataPack), RdmDeserializationError> {
        self.state.lock(|cell| {
            let bus = cell.borrow();

            if bus.buffer[0] != SC_RDM || bus.buffer[1] != SC_SUB_MESSAGE {
                return Err(RdmDeserializationError::WrongStartCode);
            }

            let message_length = bus.buffer[2] as usize;
            if !(RDM_BASE_MESSAGE_LENGTH..=RDM_MAX_PACKAGE_SIZE - 2).contains(&message_length) {
                return Err(RdmDeserializationError::WrongMessageLength(message_length));
            }

            let checksum = calculate_checksum(&bus.buffer[..message_length]);
            let wire_checksum =
                u16::from_be_bytes(bus.buffer[message_length..message_length + 2].try_into().unwrap());
            if checksum != wire_checksum {
                return Err(RdmDeserializationError::WrongChecksum);
            }

            let mut image = [0u8; RDM_HEADER_SIZE];
            RdmHeader::format_program().emplace(&mut image, &bus.buffer[..RDM_HEADER_SIZE], true);
            let header = RdmHeader::from_image(&image)
                .map_err(|_| RdmDeserializationError::CommandClassNotFound(bus.buffer[20]))?;

            let pdl = (bus.buffer[RDM_PDL_OFFSET] as usize)
                .min(message_length.saturating_sub(RDM_BASE_MESSAGE_LENGTH));
            let parameter_data =
                DataPack::from_slice(&bus.buffer[RDM_PD_OFFSET..RDM_PD_OFFSET + pdl]).unwrap();

            Ok((header, parameter_data))
        })
    }

    /// Copies an inbound frame into the shared buffer.
    pub(crate) fn load_inbound(&self, frame: &[u8]) {
        self.state.lock(|cell| {
            let mut bus = cell.borrow_mut();
            bus.buffer[..frame.len()].copy_from_slice(frame);
        });
    }

    /// Raw copy out of the shared buffer, the slot-level read the
    /// discovery path uses.
    pub(crate) fn read_slots(&self, destination: &mut [u8]) {
        self.state.lock(|cell| {
            let bus = cell.borrow();
            destination.copy_from_slice(&bus.buffer[..destination.len()]);
        });
    }

    /// Reads and advances the transaction number, wrapping at 256.
    pub(crate) fn take_transaction_number(&self) -> u8 {
        self.state.lock(|cell| {
            let mut bus = cell.borrow_mut();
            let transaction_number = bus.transaction_number;
            bus.transaction_number = transaction_number.wrapping_add(1);
            transaction_number
        })
    }

    pub(crate) fn set_sending(&self, is_sending: bool) {
        self.state.lock(|cell| cell.borrow_mut().is_sending = is_sending);
    }
}
