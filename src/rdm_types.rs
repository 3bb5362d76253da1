//! Parameter-data types for the requests the controller layer issues
//! itself. Each one round-trips through the format codec with the format
//! string of its pid.

use modular_bitfield::bitfield;
use modular_bitfield::prelude::B12;

use crate::consts::RDM_DEVICE_INFO_SIZE;
use crate::format::FormatProgram;
use crate::types::DataPack;
use crate::unique_identifier::Uid;

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeserializationError;

impl core::fmt::Display for DeserializationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "parameter data is not deserializable")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DeserializationError {}

/// DMX_START_ADDRESS parameter data, format `w$`.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmxStartAddress {
    /// The device has a dmx footprint of 0.
    NoAddress,
    /// The first slot the device listens to, 1..=512.
    Address(u16),
}

impl DmxStartAddress {
    pub fn as_u16(&self) -> u16 {
        match self {
            DmxStartAddress::Address(address) => *address,
            DmxStartAddress::NoAddress => 0xFFFF,
        }
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, DeserializationError> {
        if data.len() != 2 {
            return Err(DeserializationError);
        }

        let mut image = [0u8; 2];
        FormatProgram::parse("w$").unwrap().emplace(&mut image, data, true);

        u16::from_le_bytes(image).try_into()
    }

    pub fn serialize(&self) -> DataPack {
        let mut wire = [0u8; 2];
        FormatProgram::parse("w$")
            .unwrap()
            .emplace(&mut wire, &self.as_u16().to_le_bytes(), false);

        DataPack::from_slice(&wire).unwrap()
    }
}

impl TryFrom<u16> for DmxStartAddress {
    type Error = DeserializationError;

    fn try_from(start_address: u16) -> Result<Self, Self::Error> {
        if start_address == 0xFFFF {
            return Ok(Self::NoAddress);
        }

        if !(1..=512).contains(&start_address) {
            return Err(DeserializationError);
        }

        Ok(Self::Address(start_address))
    }
}

#[bitfield]
struct DiscControlField {
    managed_proxy: bool,
    sub_device: bool,
    boot_loader: bool,
    proxy_device: bool,
    #[skip]
    reserved: B12,
}

/// DISC_MUTE / DISC_UN_MUTE response data, format `wv`.
///
/// The control word describes how the responder sits on the bus: behind a
/// managing proxy (`managed_proxy`), answering through one
/// (`proxy_device`), exposing sub-devices (`sub_device`), or waiting in
/// its boot loader for new firmware (`boot_loader`). A device with several
/// responder ports appends the uid of its primary port as `binding_uid`.
#[derive(Debug)]
pub struct DiscoveryMuteResponse {
    pub managed_proxy: bool,
    pub sub_device: bool,
    pub boot_loader: bool,
    pub proxy_device: bool,
    pub binding_uid: Option<Uid>,
}

impl DiscoveryMuteResponse {
    pub fn deserialize(data: &[u8]) -> Result<Self, DeserializationError> {
        if data.len() != 2 && data.len() != 8 {
            return Err(DeserializationError);
        }

        let mut image = [0u8; 8];
        let parsed = FormatProgram::parse("wv").unwrap().emplace(&mut image, data, true);

        let control_field = DiscControlField::from_bytes(image[..2].try_into().unwrap());
        let binding_uid = if parsed == 8 {
            Some(Uid::from_le_bytes(&image[2..8].try_into().unwrap())).filter(|uid| !uid.is_null())
        } else {
            None
        };

        Ok(Self {
            managed_proxy: control_field.managed_proxy(),
            sub_device: control_field.sub_device(),
            boot_loader: control_field.boot_loader(),
            proxy_device: control_field.proxy_device(),
            binding_uid,
        })
    }

    pub fn serialize(&self) -> DataPack {
        let control_field = DiscControlField::new()
            .with_managed_proxy(self.managed_proxy)
            .with_sub_device(self.sub_device)
            .with_boot_loader(self.boot_loader)
            .with_proxy_device(self.proxy_device);

        let mut image = [0u8; 8];
        image[..2].copy_from_slice(&control_field.into_bytes());
        image[2..8].copy_from_slice(
            &self.binding_uid.unwrap_or(Uid::NULL).to_le_bytes(),
        );

        let mut wire = [0u8; 8];
        let written = FormatProgram::parse("wv").unwrap().emplace(&mut wire, &image, false);

        DataPack::from_slice(&wire[..written]).unwrap()
    }
}

/// DEVICE_INFO parameter data, format `#0100hwwdwbbwwb$`. The leading
/// literal is the protocol version.
#[derive(Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceInfo {
    pub device_model_id: u16,
    pub product_category: u16,
    pub software_version_id: u32,
    pub dmx_footprint: u16,
    pub current_personality: u8,
    pub personality_count: u8,
    pub dmx_start_address: DmxStartAddress,
    pub sub_device_count: u16,
    pub sensor_count: u8,
}

const DEVICE_INFO_FORMAT: &str = "#0100hwwdwbbwwb$";

impl DeviceInfo {
    pub fn deserialize(data: &[u8]) -> Result<Self, DeserializationError> {
        if data.len() != RDM_DEVICE_INFO_SIZE {
            return Err(DeserializationError);
        }

        let mut image = [0u8; RDM_DEVICE_INFO_SIZE];
        FormatProgram::parse(DEVICE_INFO_FORMAT)
            .unwrap()
            .emplace(&mut image, data, true);

        Ok(Self {
            device_model_id: u16::from_le_bytes(image[2..4].try_into().unwrap()),
            product_category: u16::from_le_bytes(image[4..6].try_into().unwrap()),
            software_version_id: u32::from_le_bytes(image[6..10].try_into().unwrap()),
            dmx_footprint: u16::from_le_bytes(image[10..12].try_into().unwrap()),
            current_personality: image[12],
            personality_count: image[13],
            dmx_start_address: u16::from_le_bytes(image[14..16].try_into().unwrap()).try_into()?,
            sub_device_count: u16::from_le_bytes(image[16..18].try_into().unwrap()),
            sensor_count: image[18],
        })
    }

    pub fn serialize(&self) -> DataPack {
        let mut image = [0u8; RDM_DEVICE_INFO_SIZE];
        image[2..4].copy_from_slice(&self.device_model_id.to_le_bytes());
        image[4..6].copy_from_slice(&self.product_category.to_le_bytes());
        image[6..10].copy_from_slice(&self.software_version_id.to_le_bytes());
        image[10..12].copy_from_slice(&self.dmx_footprint.to_le_bytes());
        image[12] = self.current_personality;
        image[13] = self.personality_count;
        image[14..16].copy_from_slice(&self.dmx_start_address.as_u16().to_le_bytes());
        image[16..18].copy_from_slice(&self.sub_device_count.to_le_bytes());
        image[18] = self.sensor_count;

        let mut wire = [0u8; RDM_DEVICE_INFO_SIZE];
        FormatProgram::parse(DEVICE_INFO_FORMAT)
            .unwrap()
            .emplace(&mut wire, &image, false);

        DataPack::from_slice(&wire).unwrap()
    }
}

/// SOFTWARE_VERSION_LABEL parameter data, format `a$`.
pub type SoftwareVersionLabel = heapless::String<32>;

pub fn deserialize_software_version_label(
    data: &[u8],
) -> Result<SoftwareVersionLabel, DeserializationError> {
    if data.len() > 32 {
        return Err(DeserializationError);
    }

    // The wire string is not null-terminated; pad so the codec sees its
    // full length.
    let mut padded = [0u8; 33];
    padded[..data.len()].copy_from_slice(data);

    let mut image = [0u8; 33];
    let written = FormatProgram::parse("a$").unwrap().emplace(&mut image, &padded, true);

    // Drop the appended terminator.
    let label = &image[..written.saturating_sub(1)];
    SoftwareVersionLabel::from_utf8(
        heapless::Vec::from_slice(label).or(Err(DeserializationError))?,
    )
    .or(Err(DeserializationError))
}
