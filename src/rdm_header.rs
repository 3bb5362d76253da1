use crate::command_class::CommandClass;
use crate::consts::RDM_HEADER_SIZE;
use crate::format::FormatProgram;
use crate::types::ResponseType;
use crate::unique_identifier::Uid;

/// Format of the frame header: the `0xCC 0x01` start codes and the base
/// message length as literals, then both uids, transaction number,
/// port id / response type, message count, sub-device, command class and
/// parameter id. The pdl slot follows the formatted region.
pub const RDM_HEADER_FORMAT: &str = "#cc01#18huubbbwbw";

/// The logical RDM message envelope, shared by requests and responses.
///
/// The `port_id` slot is overloaded by direction: a controller writes its
/// port id there, a responder answers with the response type. The parameter
/// data length does not live here; it travels with the parameter data
/// itself.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RdmHeader {
    pub destination_uid: Uid,
    pub source_uid: Uid,
    pub transaction_number: u8,
    /// Port id on requests, response type on responses.
    pub port_id: u8,
    pub message_count: u8,
    pub sub_device: u16,
    pub command_class: CommandClass,
    pub parameter_id: u16,
}

impl RdmHeader {
    /// Interprets the overloaded `port_id` slot as a response type.
    pub fn response_type(&self) -> Result<ResponseType, ()> {
        ResponseType::try_from(self.port_id)
    }

    /// The host-order image [RDM_HEADER_FORMAT] maps onto the wire. The
    /// three leading slots belong to the format's literals and carry no
    /// information here.
    pub fn to_image(&self) -> [u8; RDM_HEADER_SIZE] {
        let mut image = [0u8; RDM_HEADER_SIZE];

        image[3..9].copy_from_slice(&self.destination_uid.to_le_bytes());
        image[9..15].copy_from_slice(&self.source_uid.to_le_bytes());
        image[15] = self.transaction_number;
        image[16] = self.port_id;
        image[17] = self.message_count;
        image[18..20].copy_from_slice(&self.sub_device.to_le_bytes());
        image[20] = self.command_class as u8;
        image[21..23].copy_from_slice(&self.parameter_id.to_le_bytes());

        image
    }

    /// Rebuilds a header from a deserialized image. Fails on an unknown
    /// command class; the overloaded `port_id` slot is kept raw.
    pub fn from_image(image: &[u8; RDM_HEADER_SIZE]) -> Result<Self, ()> {
        Ok(Self {
            destination_uid: Uid::from_le_bytes(&image[3..9].try_into().unwrap()),
            source_uid: Uid::from_le_bytes(&image[9..15].try_into().unwrap()),
            transaction_number: image[15],
            port_id: image[16],
            message_count: image[17],
            sub_device: u16::from_le_bytes(image[18..20].try_into().unwrap()),
            command_class: CommandClass::try_from(image[20])?,
            parameter_id: u16::from_le_bytes(image[21..23].try_into().unwrap()),
        })
    }

    /// The parsed [RDM_HEADER_FORMAT]; the format string is static and
    /// known-good, so the parse cannot fail.
    pub(crate) fn format_program() -> FormatProgram {
        FormatProgram::parse(RDM_HEADER_FORMAT).unwrap()
    }
}
