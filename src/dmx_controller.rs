//! The controller side of the bus: the transaction engine that drives one
//! request through turnaround and response classification, plus typed
//! requests for the pids the crate speaks itself.

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::command_class::CommandClass;
use crate::consts::{
    RDM_MAX_DISCOVERY_RESPONSE_SIZE, RDM_MAX_PACKAGE_SIZE, RDM_RESPONSE_TIMEOUT_TICKS,
    RDM_SEND_TIMEOUT_TICKS, SUB_DEVICE_ALL, SUB_DEVICE_ROOT,
};
use crate::discovery::{decode_euid, DiscoveryOption};
use crate::dmx_port::{DmxPort, FrameWriteError};
use crate::dmx_uart_hal::{DmxUartError, DmxUartHal};
use crate::format::FormatProgram;
use crate::pids;
use crate::rdm_header::RdmHeader;
use crate::rdm_types::{
    deserialize_software_version_label, DeviceInfo, DiscoveryMuteResponse, DmxStartAddress,
    SoftwareVersionLabel,
};
use crate::types::{DataPack, RdmAck, ResponseType};
use crate::unique_identifier::Uid;

/// A precondition the engine rejects before touching the bus.
#[derive(Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestError {
    /// A request must name a destination.
    DestinationUidIsNull,
    /// A request cannot come from a broadcast address.
    SourceUidIsBroadcast,
    /// The command class is not a request class.
    InvalidCommandClass,
    /// Sub-device ids run 0..=512; ALL is additionally barred from gets.
    SubDeviceOutOfRange,
    /// A dmx start address must be between 1 and 512.
    StartAddressOutOfRange,
    /// The frame could not be staged.
    Write(FrameWriteError),
}

impl core::fmt::Display for RequestError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RequestError::DestinationUidIsNull => write!(f, "destination uid is null"),
            RequestError::SourceUidIsBroadcast => write!(f, "source uid is a broadcast"),
            RequestError::InvalidCommandClass => write!(f, "command class is not a request"),
            RequestError::SubDeviceOutOfRange => write!(f, "sub device is out of range"),
            RequestError::StartAddressOutOfRange => write!(f, "start address is out of range"),
            RequestError::Write(error) => error.fmt(f),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RequestError {}

impl From<FrameWriteError> for RequestError {
    fn from(value: FrameWriteError) -> Self {
        Self::Write(value)
    }
}

/// Errors of the typed requests, folding the ack taxonomy into `Result`.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RdmResponseError<E> {
    /// A precondition failed; nothing was transmitted.
    Request(RequestError),
    /// Timeout, framing error or a response not matching the request.
    InvalidResponse(Option<DmxUartError<E>>),
    /// The responder refused the request; contains the reason code.
    NotAcknowledged(u16),
    /// The response isn't ready yet; retry after the given ticks.
    NotReady(u32),
    /// An overflow continuation this request cannot drive.
    IncompleteResponse,
    /// The response arrived but its parameter data did not parse.
    ParameterDataNotDeserializable,
}

impl<E: core::fmt::Debug> core::fmt::Display for RdmResponseError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(self, f)
    }
}

#[cfg(feature = "std")]
impl<E: core::fmt::Debug> std::error::Error for RdmResponseError<E> {}

impl<E> From<RequestError> for RdmResponseError<E> {
    fn from(value: RequestError) -> Self {
        Self::Request(value)
    }
}

impl<E> From<crate::rdm_types::DeserializationError> for RdmResponseError<E> {
    fn from(_: crate::rdm_types::DeserializationError) -> Self {
        Self::ParameterDataNotDeserializable
    }
}

impl<D: DmxUartHal, M: RawMutex> DmxPort<D, M> {
    /// Drives one transaction: stages the frame, transmits it and, when the
    /// destination solicits one, awaits and classifies the response.
    ///
    /// The caller fills the header with destination, sub-device, command
    /// class and pid; the engine completes port id, source uid, transaction
    /// number and message count. On return the header holds the response
    /// envelope (a synthesized one for discovery responses, which carry no
    /// header on the wire). Everything the caller needs to act on is in the
    /// returned [RdmAck]; the engine never retries.
    pub fn rdm_request(
        &mut self,
        header: &mut RdmHeader,
        parameter_data: &[u8],
    ) -> Result<RdmAck<D::Error>, RequestError> {
        if header.destination_uid.is_null() {
            return Err(RequestError::DestinationUidIsNull);
        }
        if header.source_uid.is_broadcast() {
            return Err(RequestError::SourceUidIsBroadcast);
        }
        if !header.command_class.is_request() {
            return Err(RequestError::InvalidCommandClass);
        }
        if header.sub_device >= 513
            && !(header.sub_device == SUB_DEVICE_ALL
                && header.command_class != CommandClass::GetCommand)
        {
            return Err(RequestError::SubDeviceOutOfRange);
        }

        // Complete the header slots the caller may leave blank.
        if header.port_id == 0 {
            header.port_id = self.port_number + 1;
        }
        if header.source_uid.is_null() {
            header.source_uid = self.uid;
        }
        header.transaction_number = self.take_transaction_number();
        header.message_count = 0;

        let is_discovery_branch = header.parameter_id == pids::DISC_UNIQUE_BRANCH
            && header.command_class == CommandClass::DiscoveryCommand;
        let response_expected = !header.destination_uid.is_broadcast() || is_discovery_branch;
        let request = *header;

        let tx_size = self.write(header, parameter_data)?;
        let sent = {
            let Self { hal, state, .. } = self;
            state.lock(|cell| {
                let mut bus = cell.borrow_mut();
                bus.is_sending = true;
                hal.send_frame(&bus.buffer[..tx_size])
            })
        };
        if let Err(fault) = sent {
            self.set_sending(false);
            return Ok(RdmAck::Invalid { fault: Some(fault) });
        }

        if !response_expected {
            let _ = self.hal.wait_sent(RDM_SEND_TIMEOUT_TICKS);
            self.set_sending(false);
            return Ok(RdmAck::NoResponse);
        }

        // The responder turnaround; discovery responses carry no break.
        let mut inbound = [0u8; RDM_MAX_PACKAGE_SIZE];
        let received = if is_discovery_branch {
            self.hal
                .read_frames_no_break(&mut inbound, RDM_RESPONSE_TIMEOUT_TICKS)
        } else {
            self.hal.read_frames(&mut inbound, RDM_RESPONSE_TIMEOUT_TICKS)
        };
        self.set_sending(false);

        let received = match received {
            Ok(received) => received.min(RDM_MAX_PACKAGE_SIZE),
            Err(fault) => return Ok(RdmAck::Invalid { fault: Some(fault) }),
        };
        self.load_inbound(&inbound[..received]);

        if is_discovery_branch {
            Ok(self.classify_discovery_response(header, received))
        } else {
            Ok(self.classify_response(header, &request, received))
        }
    }

    /// Validates a standard response against the outstanding request and
    /// maps it onto the ack taxonomy.
    fn classify_response(
        &mut self,
        header: &mut RdmHeader,
        request: &RdmHeader,
        received: usize,
    ) -> RdmAck<D::Error> {
        let (response, parameter_data) = match self.read() {
            Ok(frame) => frame,
            Err(_) => return RdmAck::Invalid { fault: None },
        };

        let response_type = match response.response_type() {
            Ok(response_type) => response_type,
            Err(_) => return RdmAck::Invalid { fault: None },
        };

        if request.command_class.response_class() != Some(response.command_class)
            || request.parameter_id != response.parameter_id
            || request.transaction_number != response.transaction_number
            || !response.source_uid.is_target(&request.destination_uid)
            || request.source_uid != response.destination_uid
        {
            return RdmAck::Invalid { fault: None };
        }

        *header = response;

        match response_type {
            ResponseType::Ack => RdmAck::Acknowledged {
                size: received,
                parameter_data,
            },
            ResponseType::AckTimer => match decode_timer_estimate(&parameter_data) {
                Some(millis) => RdmAck::AcknowledgedTimer {
                    ticks: self.hal.millis_to_ticks(millis),
                },
                None => RdmAck::Invalid { fault: None },
            },
            ResponseType::NackReason => {
                if parameter_data.len() < 2 {
                    return RdmAck::Invalid { fault: None };
                }
                RdmAck::NotAcknowledged {
                    reason: u16::from_be_bytes(parameter_data[..2].try_into().unwrap()),
                }
            },
            ResponseType::AckOverflow => RdmAck::AcknowledgedOverflow { parameter_data },
        }
    }

    /// A DISC_UNIQUE_BRANCH answer is a bare euid; decode it and synthesize
    /// the response envelope so callers see a uniform shape.
    fn classify_discovery_response(
        &mut self,
        header: &mut RdmHeader,
        received: usize,
    ) -> RdmAck<D::Error> {
        let clamped = received.min(RDM_MAX_DISCOVERY_RESPONSE_SIZE);
        let mut euid = [0u8; RDM_MAX_DISCOVERY_RESPONSE_SIZE];
        self.read_slots(&mut euid[..clamped]);

        let (uid, consumed) = match decode_euid(&euid[..clamped]) {
            Ok(decoded) => decoded,
            Err(_) => return RdmAck::Invalid { fault: None },
        };

        *header = RdmHeader {
            destination_uid: Uid::NULL,
            source_uid: uid,
            transaction_number: 0,
            port_id: ResponseType::Ack as u8,
            message_count: 0,
            sub_device: SUB_DEVICE_ROOT,
            command_class: CommandClass::DiscoveryCommandResponse,
            parameter_id: pids::DISC_UNIQUE_BRANCH,
        };

        RdmAck::Acknowledged {
            size: consumed,
            parameter_data: DataPack::new(),
        }
    }

    fn request_header(&self, destination_uid: Uid, command_class: CommandClass, pid: u16) -> RdmHeader {
        RdmHeader {
            destination_uid,
            source_uid: Uid::NULL, // filled by the engine
            transaction_number: 0,
            port_id: 0,
            message_count: 0,
            sub_device: SUB_DEVICE_ROOT,
            command_class,
            parameter_id: pid,
        }
    }

    /// Solicits discovery responses from every unmuted device whose uid
    /// falls within `lower_bound..=upper_bound`.
    pub fn rdm_disc_unique_branch(
        &mut self,
        lower_bound: Uid,
        upper_bound: Uid,
    ) -> Result<DiscoveryOption, RdmResponseError<D::Error>> {
        let mut image = [0u8; 12];
        image[..6].copy_from_slice(&lower_bound.to_le_bytes());
        image[6..].copy_from_slice(&upper_bound.to_le_bytes());
        let mut branch_params = [0u8; 12];
        FormatProgram::parse("uu$")
            .unwrap()
            .emplace(&mut branch_params, &image, false);

        let mut header = self.request_header(
            Uid::BROADCAST_ALL,
            CommandClass::DiscoveryCommand,
            pids::DISC_UNIQUE_BRANCH,
        );

        match self.rdm_request(&mut header, &branch_params)? {
            RdmAck::Acknowledged { .. } => Ok(DiscoveryOption::Found(header.source_uid)),
            RdmAck::Invalid {
                fault: Some(DmxUartError::TimeoutError),
            } => Ok(DiscoveryOption::NoDevice),
            RdmAck::Invalid { .. } => Ok(DiscoveryOption::Collision),
            _ => Ok(DiscoveryOption::Collision),
        }
    }

    /// Mute a device from discovery. Returns `None` on a broadcast, which
    /// solicits no response.
    pub fn rdm_disc_mute(
        &mut self,
        uid: Uid,
    ) -> Result<Option<DiscoveryMuteResponse>, RdmResponseError<D::Error>> {
        self.disc_mute_request(uid, pids::DISC_MUTE)
    }

    /// Unmute a device so it responds to discovery again.
    pub fn rdm_disc_un_mute(
        &mut self,
        uid: Uid,
    ) -> Result<Option<DiscoveryMuteResponse>, RdmResponseError<D::Error>> {
        self.disc_mute_request(uid, pids::DISC_UN_MUTE)
    }

    fn disc_mute_request(
        &mut self,
        uid: Uid,
        pid: u16,
    ) -> Result<Option<DiscoveryMuteResponse>, RdmResponseError<D::Error>> {
        let mut header = self.request_header(uid, CommandClass::DiscoveryCommand, pid);

        match self.rdm_request(&mut header, &[])? {
            RdmAck::NoResponse => Ok(None),
            RdmAck::Acknowledged { parameter_data, .. } => {
                Ok(Some(DiscoveryMuteResponse::deserialize(&parameter_data)?))
            },
            ack => Err(ack_to_error(ack)),
        }
    }

    /// Get the current start address of a dmx responder.
    pub fn rdm_get_dmx_start_address(
        &mut self,
        uid: Uid,
    ) -> Result<DmxStartAddress, RdmResponseError<D::Error>> {
        let mut header = self.request_header(uid, CommandClass::GetCommand, pids::DMX_START_ADDRESS);

        match self.rdm_request(&mut header, &[])? {
            RdmAck::Acknowledged { parameter_data, .. } => {
                Ok(DmxStartAddress::deserialize(&parameter_data)?)
            },
            ack => Err(ack_to_error(ack)),
        }
    }

    /// Set the start address of a dmx responder. The address has to be
    /// between 1 and 512.
    pub fn rdm_set_dmx_start_address(
        &mut self,
        uid: Uid,
        start_address: u16,
    ) -> Result<(), RdmResponseError<D::Error>> {
        if !(1..=512).contains(&start_address) {
            return Err(RequestError::StartAddressOutOfRange.into());
        }

        let mut header = self.request_header(uid, CommandClass::SetCommand, pids::DMX_START_ADDRESS);
        let parameter_data = DmxStartAddress::Address(start_address).serialize();

        match self.rdm_request(&mut header, &parameter_data)? {
            RdmAck::NoResponse | RdmAck::Acknowledged { .. } => Ok(()),
            ack => Err(ack_to_error(ack)),
        }
    }

    /// Get the device info from an rdm responder.
    pub fn rdm_get_device_info(
        &mut self,
        uid: Uid,
    ) -> Result<DeviceInfo, RdmResponseError<D::Error>> {
        let mut header = self.request_header(uid, CommandClass::GetCommand, pids::DEVICE_INFO);

        match self.rdm_request(&mut header, &[])? {
            RdmAck::Acknowledged { parameter_data, .. } => {
                Ok(DeviceInfo::deserialize(&parameter_data)?)
            },
            ack => Err(ack_to_error(ack)),
        }
    }

    /// Get the software version label of an rdm responder.
    pub fn rdm_get_software_version_label(
        &mut self,
        uid: Uid,
    ) -> Result<SoftwareVersionLabel, RdmResponseError<D::Error>> {
        let mut header =
            self.request_header(uid, CommandClass::GetCommand, pids::SOFTWARE_VERSION_LABEL);

        match self.rdm_request(&mut header, &[])? {
            RdmAck::Acknowledged { parameter_data, .. } => {
                Ok(deserialize_software_version_label(&parameter_data)?)
            },
            ack => Err(ack_to_error(ack)),
        }
    }

    /// Set the identify state of an rdm responder (the "find me" beacon).
    pub fn rdm_set_identify(
        &mut self,
        uid: Uid,
        enabled: bool,
    ) -> Result<(), RdmResponseError<D::Error>> {
        let mut header = self.request_header(uid, CommandClass::SetCommand, pids::IDENTIFY_DEVICE);

        match self.rdm_request(&mut header, &[enabled as u8])? {
            RdmAck::NoResponse | RdmAck::Acknowledged { .. } => Ok(()),
            ack => Err(ack_to_error(ack)),
        }
    }
}

/// The timer estimate is a 16-bit count of 10 ms steps.
fn decode_timer_estimate(parameter_data: &[u8]) -> Option<u32> {
    if parameter_data.len() < 2 {
        return None;
    }
    let estimate = u16::from_be_bytes(parameter_data[..2].try_into().unwrap());
    Some(estimate as u32 * 10)
}

fn ack_to_error<E>(ack: RdmAck<E>) -> RdmResponseError<E> {
    match ack {
        RdmAck::Invalid { fault } => RdmResponseError::InvalidResponse(fault),
        RdmAck::NotAcknowledged { reason } => RdmResponseError::NotAcknowledged(reason),
        RdmAck::AcknowledgedTimer { ticks } => RdmResponseError::NotReady(ticks),
        RdmAck::AcknowledgedOverflow { .. } => RdmResponseError::IncompleteResponse,
        // NoResponse and Acknowledged are handled by the callers.
        RdmAck::NoResponse | RdmAck::Acknowledged { .. } => {
            RdmResponseError::InvalidResponse(None)
        },
    }
}
