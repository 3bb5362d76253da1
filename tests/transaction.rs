//! Drives the transaction engine end to end through a scripted uart.

use std::collections::VecDeque;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;

use dmx_rdm_bus::command_class::CommandClass;
use dmx_rdm_bus::consts::SUB_DEVICE_ALL;
use dmx_rdm_bus::discovery::{encode_euid, DiscoveryOption};
use dmx_rdm_bus::dmx_controller::{RdmResponseError, RequestError};
use dmx_rdm_bus::dmx_port::{DmxPort, DmxPortConfig};
use dmx_rdm_bus::dmx_uart_hal::{Direction, DmxUartError, DmxUartHal};
use dmx_rdm_bus::pids;
use dmx_rdm_bus::rdm_header::RdmHeader;
use dmx_rdm_bus::rdm_types::DmxStartAddress;
use dmx_rdm_bus::types::{NackReason, RdmAck, ResponseType};
use dmx_rdm_bus::unique_identifier::Uid;

const CONTROLLER_UID: Uid = Uid::new(0x7FF0, 0x00000000);
const DEVICE_UID: Uid = Uid::new(0x5AFE, 0x12345678);

/// A uart that records outbound frames and plays back a scripted sequence
/// of inbound ones. One scheduler tick is 10 ms.
#[derive(Default)]
struct ScriptedUart {
    outbound: bool,
    sent_frames: Vec<Vec<u8>>,
    inbound: VecDeque<Result<Vec<u8>, ()>>,
    break_reads: usize,
    no_break_reads: usize,
}

impl ScriptedUart {
    fn enqueue_frame(&mut self, frame: Vec<u8>) {
        self.inbound.push_back(Ok(frame));
    }

    fn enqueue_timeout(&mut self) {
        self.inbound.push_back(Err(()));
    }

    fn next_inbound(&mut self, buffer: &mut [u8]) -> Result<usize, DmxUartError<()>> {
        match self.inbound.pop_front() {
            Some(Ok(frame)) => {
                buffer[..frame.len()].copy_from_slice(&frame);
                Ok(frame.len())
            },
            Some(Err(())) | None => Err(DmxUartError::TimeoutError),
        }
    }
}

impl DmxUartHal for ScriptedUart {
    type Error = ();

    fn rts(&mut self) -> Direction {
        if self.outbound {
            Direction::Outbound
        } else {
            Direction::Inbound
        }
    }

    fn set_rts(&mut self, direction: Direction) {
        self.outbound = direction == Direction::Outbound;
    }

    fn send_frame(&mut self, frame: &[u8]) -> Result<(), DmxUartError<()>> {
        self.sent_frames.push(frame.to_vec());
        Ok(())
    }

    fn wait_sent(&mut self, _ticks: u32) -> Result<(), DmxUartError<()>> {
        Ok(())
    }

    fn read_frames(&mut self, buffer: &mut [u8], _ticks: u32) -> Result<usize, DmxUartError<()>> {
        self.break_reads += 1;
        self.next_inbound(buffer)
    }

    fn read_frames_no_break(
        &mut self,
        buffer: &mut [u8],
        _ticks: u32,
    ) -> Result<usize, DmxUartError<()>> {
        self.no_break_reads += 1;
        self.next_inbound(buffer)
    }

    fn millis_to_ticks(&self, millis: u32) -> u32 {
        millis / 10
    }
}

fn test_port() -> DmxPort<ScriptedUart, NoopRawMutex> {
    DmxPort::new(
        ScriptedUart::default(),
        DmxPortConfig {
            uid: CONTROLLER_UID,
            port_number: 0,
        },
    )
}

fn get_request(pid: u16) -> RdmHeader {
    RdmHeader {
        destination_uid: DEVICE_UID,
        source_uid: Uid::NULL,
        transaction_number: 0,
        port_id: 0,
        message_count: 0,
        sub_device: 0,
        command_class: CommandClass::GetCommand,
        parameter_id: pid,
    }
}

/// Builds a raw response frame independently of the crate's serializer.
fn response_frame(tn: u8, response_type: ResponseType, cc: u8, pid: u16, pd: &[u8]) -> Vec<u8> {
    let mut frame = vec![0xCC, 0x01, (24 + pd.len()) as u8];
    frame.extend_from_slice(&CONTROLLER_UID.to_bytes());
    frame.extend_from_slice(&DEVICE_UID.to_bytes());
    frame.push(tn);
    frame.push(response_type as u8);
    frame.push(0); // message count
    frame.extend_from_slice(&0u16.to_be_bytes()); // sub device
    frame.push(cc);
    frame.extend_from_slice(&pid.to_be_bytes());
    frame.push(pd.len() as u8);
    frame.extend_from_slice(pd);

    let checksum = frame
        .iter()
        .fold(0u16, |sum, &byte| sum.wrapping_add(byte as u16));
    frame.extend_from_slice(&checksum.to_be_bytes());
    frame
}

#[test]
fn test_request_normalizes_and_transmits() {
    let mut port = test_port();
    port.get_driver()
        .enqueue_frame(response_frame(0, ResponseType::Ack, 0x21, 0x0060, &[]));

    let mut header = get_request(0x0060);
    port.rdm_request(&mut header, &[]).unwrap();

    let driver = port.get_driver();
    assert_eq!(driver.sent_frames.len(), 1);
    let sent = &driver.sent_frames[0];

    assert_eq!(&sent[..3], &[0xCC, 0x01, 0x18]);
    assert_eq!(&sent[3..9], &DEVICE_UID.to_bytes());
    // Null source uid was replaced with the port's own.
    assert_eq!(&sent[9..15], &CONTROLLER_UID.to_bytes());
    assert_eq!(sent[15], 0); // first transaction number
    assert_eq!(sent[16], 1); // port id 0 became port number + 1
    assert_eq!(sent[20], 0x20);
    assert_eq!(sent.len(), 26);
}

#[test]
fn test_transaction_number_increments() {
    let mut port = test_port();
    for expected_tn in 0..3u8 {
        port.get_driver().enqueue_frame(response_frame(
            expected_tn,
            ResponseType::Ack,
            0x21,
            0x0060,
            &[],
        ));

        let mut header = get_request(0x0060);
        let ack = port.rdm_request(&mut header, &[]).unwrap();

        assert!(matches!(ack, RdmAck::Acknowledged { .. }));
        assert_eq!(port.get_driver().sent_frames[expected_tn as usize][15], expected_tn);
    }
}

#[test]
fn test_ack_carries_parameter_data() {
    let mut port = test_port();
    let frame = response_frame(0, ResponseType::Ack, 0x21, 0x00F0, &[0x00, 0x11]);
    let frame_len = frame.len();
    port.get_driver().enqueue_frame(frame);

    let mut header = get_request(0x00F0);
    match port.rdm_request(&mut header, &[]).unwrap() {
        RdmAck::Acknowledged {
            size,
            parameter_data,
        } => {
            assert_eq!(size, frame_len);
            assert_eq!(&parameter_data[..], &[0x00, 0x11]);
        },
        ack => panic!("expected ack, got {ack:?}"),
    }

    // The response envelope replaced the request's.
    assert_eq!(header.command_class, CommandClass::GetCommandResponse);
    assert_eq!(header.source_uid, DEVICE_UID);
    assert_eq!(header.response_type(), Ok(ResponseType::Ack));
}

#[test]
fn test_nack_reason_is_decoded() {
    let mut port = test_port();
    port.get_driver().enqueue_frame(response_frame(
        0,
        ResponseType::NackReason,
        0x21,
        0x0060,
        &[0x00, 0x05],
    ));

    let mut header = get_request(0x0060);
    let ack = port.rdm_request(&mut header, &[]).unwrap();

    match &ack {
        RdmAck::NotAcknowledged { reason } => assert_eq!(*reason, 5),
        ack => panic!("expected nack, got {ack:?}"),
    }
    assert_eq!(ack.nack_reason(), Some(NackReason::UnsupportedCommandClass));
}

#[test]
fn test_ack_timer_converts_to_ticks() {
    let mut port = test_port();
    // 10 steps of 10 ms = 100 ms = 10 of the mock's ticks.
    port.get_driver().enqueue_frame(response_frame(
        0,
        ResponseType::AckTimer,
        0x21,
        0x0060,
        &[0x00, 0x0A],
    ));

    let mut header = get_request(0x0060);
    match port.rdm_request(&mut header, &[]).unwrap() {
        RdmAck::AcknowledgedTimer { ticks } => assert_eq!(ticks, 10),
        ack => panic!("expected ack timer, got {ack:?}"),
    }
}

#[test]
fn test_ack_overflow_is_reported_distinctly() {
    let mut port = test_port();
    port.get_driver().enqueue_frame(response_frame(
        0,
        ResponseType::AckOverflow,
        0x21,
        0x0060,
        &[0xAA; 8],
    ));

    let mut header = get_request(0x0060);
    match port.rdm_request(&mut header, &[]).unwrap() {
        RdmAck::AcknowledgedOverflow { parameter_data } => {
            assert_eq!(parameter_data.len(), 8);
        },
        ack => panic!("expected ack overflow, got {ack:?}"),
    }
}

#[test]
fn test_mismatched_transaction_number_is_invalid() {
    let mut port = test_port();
    // The port will send tn 0; answer with tn 8.
    port.get_driver()
        .enqueue_frame(response_frame(8, ResponseType::Ack, 0x21, 0x0060, &[]));

    let mut header = get_request(0x0060);
    assert!(matches!(
        port.rdm_request(&mut header, &[]).unwrap(),
        RdmAck::Invalid { fault: None }
    ));
}

#[test]
fn test_mismatched_pid_is_invalid() {
    let mut port = test_port();
    port.get_driver()
        .enqueue_frame(response_frame(0, ResponseType::Ack, 0x21, 0x0061, &[]));

    let mut header = get_request(0x0060);
    assert!(matches!(
        port.rdm_request(&mut header, &[]).unwrap(),
        RdmAck::Invalid { fault: None }
    ));
}

#[test]
fn test_response_from_wrong_device_is_invalid() {
    let mut port = test_port();
    let mut frame = response_frame(0, ResponseType::Ack, 0x21, 0x0060, &[]);
    // Patch the source uid to a stranger and fix the checksum.
    frame[9..15].copy_from_slice(&Uid::new(0x1234, 0x00000001).to_bytes());
    let length = frame.len();
    frame.truncate(length - 2);
    let checksum = frame
        .iter()
        .fold(0u16, |sum, &byte| sum.wrapping_add(byte as u16));
    frame.extend_from_slice(&checksum.to_be_bytes());
    port.get_driver().enqueue_frame(frame);

    let mut header = get_request(0x0060);
    assert!(matches!(
        port.rdm_request(&mut header, &[]).unwrap(),
        RdmAck::Invalid { fault: None }
    ));
}

#[test]
fn test_corrupted_checksum_is_invalid() {
    let mut port = test_port();
    let mut frame = response_frame(0, ResponseType::Ack, 0x21, 0x0060, &[]);
    frame[10] ^= 0xFF;
    port.get_driver().enqueue_frame(frame);

    let mut header = get_request(0x0060);
    assert!(matches!(
        port.rdm_request(&mut header, &[]).unwrap(),
        RdmAck::Invalid { fault: None }
    ));
}

#[test]
fn test_timeout_surfaces_the_fault() {
    let mut port = test_port();
    port.get_driver().enqueue_timeout();

    let mut header = get_request(0x0060);
    assert!(matches!(
        port.rdm_request(&mut header, &[]).unwrap(),
        RdmAck::Invalid {
            fault: Some(DmxUartError::TimeoutError)
        }
    ));
}

#[test]
fn test_broadcast_expects_no_response() {
    let mut port = test_port();

    let mut header = get_request(pids::IDENTIFY_DEVICE);
    header.destination_uid = Uid::BROADCAST_ALL;
    header.command_class = CommandClass::SetCommand;

    let ack = port.rdm_request(&mut header, &[1]).unwrap();
    assert!(matches!(ack, RdmAck::NoResponse));

    let driver = port.get_driver();
    assert_eq!(driver.sent_frames.len(), 1);
    assert_eq!(driver.break_reads + driver.no_break_reads, 0);
}

#[test]
fn test_broadcast_discovery_awaits_response() {
    let mut port = test_port();

    let mut euid = [0u8; 24];
    let encoded = encode_euid(&mut euid, &DEVICE_UID, 4);
    port.get_driver().enqueue_frame(euid[..encoded].to_vec());

    let mut header = get_request(pids::DISC_UNIQUE_BRANCH);
    header.destination_uid = Uid::BROADCAST_ALL;
    header.command_class = CommandClass::DiscoveryCommand;

    let ack = port.rdm_request(&mut header, &[0; 12]).unwrap();
    assert!(matches!(ack, RdmAck::Acknowledged { .. }));

    // Discovery responses carry no break.
    assert_eq!(port.get_driver().no_break_reads, 1);
    assert_eq!(port.get_driver().break_reads, 0);

    // The engine synthesizes the response envelope.
    assert_eq!(header.source_uid, DEVICE_UID);
    assert_eq!(header.destination_uid, Uid::NULL);
    assert_eq!(header.command_class, CommandClass::DiscoveryCommandResponse);
    assert_eq!(header.parameter_id, pids::DISC_UNIQUE_BRANCH);
    assert_eq!(header.transaction_number, 0);
}

#[test]
fn test_garbled_discovery_response_is_invalid() {
    let mut port = test_port();

    // Two overlapping responses AND into garbage that fails the checksum.
    let mut euid_a = [0u8; 24];
    let mut euid_b = [0u8; 24];
    encode_euid(&mut euid_a, &DEVICE_UID, 4);
    encode_euid(&mut euid_b, &Uid::new(0x5AFE, 0x12345688), 4);
    let collided: Vec<u8> = euid_a.iter().zip(euid_b.iter()).map(|(a, b)| a & b).collect();
    port.get_driver().enqueue_frame(collided);

    let mut header = get_request(pids::DISC_UNIQUE_BRANCH);
    header.destination_uid = Uid::BROADCAST_ALL;
    header.command_class = CommandClass::DiscoveryCommand;

    assert!(matches!(
        port.rdm_request(&mut header, &[0; 12]).unwrap(),
        RdmAck::Invalid { fault: None }
    ));
}

#[test]
fn test_preconditions_fail_fast() {
    let mut port = test_port();

    let mut header = get_request(0x0060);
    header.destination_uid = Uid::NULL;
    assert_eq!(
        port.rdm_request(&mut header, &[]).unwrap_err(),
        RequestError::DestinationUidIsNull
    );

    let mut header = get_request(0x0060);
    header.source_uid = Uid::BROADCAST_ALL;
    assert_eq!(
        port.rdm_request(&mut header, &[]).unwrap_err(),
        RequestError::SourceUidIsBroadcast
    );

    let mut header = get_request(0x0060);
    header.command_class = CommandClass::GetCommandResponse;
    assert_eq!(
        port.rdm_request(&mut header, &[]).unwrap_err(),
        RequestError::InvalidCommandClass
    );

    let mut header = get_request(0x0060);
    header.sub_device = 513;
    assert_eq!(
        port.rdm_request(&mut header, &[]).unwrap_err(),
        RequestError::SubDeviceOutOfRange
    );

    // ALL sub-devices is barred from gets but fine for sets.
    let mut header = get_request(0x0060);
    header.sub_device = SUB_DEVICE_ALL;
    assert_eq!(
        port.rdm_request(&mut header, &[]).unwrap_err(),
        RequestError::SubDeviceOutOfRange
    );

    // Nothing reached the wire.
    assert!(port.get_driver().sent_frames.is_empty());
}

#[test]
fn test_disc_unique_branch_maps_outcomes() {
    let mut port = test_port();

    port.get_driver().enqueue_timeout();
    assert!(matches!(
        port.rdm_disc_unique_branch(Uid::new(0, 1), Uid::MAX_DEVICE)
            .unwrap(),
        DiscoveryOption::NoDevice
    ));

    let mut euid = [0u8; 24];
    let encoded = encode_euid(&mut euid, &DEVICE_UID, 7);
    port.get_driver().enqueue_frame(euid[..encoded].to_vec());
    match port
        .rdm_disc_unique_branch(Uid::new(0, 1), Uid::MAX_DEVICE)
        .unwrap()
    {
        DiscoveryOption::Found(uid) => assert_eq!(uid, DEVICE_UID),
        option => panic!("expected a found device, got {option:?}"),
    }

    port.get_driver().enqueue_frame(vec![0xAA; 24]);
    assert!(matches!(
        port.rdm_disc_unique_branch(Uid::new(0, 1), Uid::MAX_DEVICE)
            .unwrap(),
        DiscoveryOption::Collision
    ));

    // The branch parameters are the two bounds, big-endian.
    let sent = &port.get_driver().sent_frames[0];
    assert_eq!(sent[23], 12);
    assert_eq!(&sent[24..30], &Uid::new(0, 1).to_bytes());
    assert_eq!(&sent[30..36], &Uid::MAX_DEVICE.to_bytes());
}

#[test]
fn test_get_dmx_start_address_end_to_end() {
    let mut port = test_port();
    port.get_driver().enqueue_frame(response_frame(
        0,
        ResponseType::Ack,
        0x21,
        pids::DMX_START_ADDRESS,
        &[0x00, 0x11],
    ));

    assert_eq!(
        port.rdm_get_dmx_start_address(DEVICE_UID).unwrap(),
        DmxStartAddress::Address(0x11)
    );
}

#[test]
fn test_set_dmx_start_address_rejects_out_of_range() {
    let mut port = test_port();

    for address in [0u16, 513] {
        assert!(matches!(
            port.rdm_set_dmx_start_address(DEVICE_UID, address),
            Err(RdmResponseError::Request(
                RequestError::StartAddressOutOfRange
            ))
        ));
    }

    assert!(port.get_driver().sent_frames.is_empty());
}

#[test]
fn test_nack_maps_to_typed_error() {
    let mut port = test_port();
    port.get_driver().enqueue_frame(response_frame(
        0,
        ResponseType::NackReason,
        0x21,
        pids::DMX_START_ADDRESS,
        &[0x00, 0x00],
    ));

    match port.rdm_get_dmx_start_address(DEVICE_UID) {
        Err(RdmResponseError::NotAcknowledged(reason)) => assert_eq!(reason, 0),
        result => panic!("expected a nack error, got {result:?}"),
    }
}

#[test]
fn test_disc_mute_broadcast_returns_none() {
    let mut port = test_port();
    assert!(port.rdm_disc_un_mute(Uid::BROADCAST_ALL).unwrap().is_none());
    assert_eq!(port.get_driver().sent_frames.len(), 1);
}

#[test]
fn test_disc_mute_parses_control_field() {
    let mut port = test_port();
    port.get_driver().enqueue_frame(response_frame(
        0,
        ResponseType::Ack,
        0x11,
        pids::DISC_MUTE,
        &[0x00, 0x02],
    ));

    let response = port.rdm_disc_mute(DEVICE_UID).unwrap().unwrap();
    assert!(response.sub_device);
    assert!(response.binding_uid.is_none());
}
