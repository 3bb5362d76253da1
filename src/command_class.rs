/// RDM command classes. A request class and its response class differ by
/// one: `DiscoveryCommand` (0x10) is answered by `DiscoveryCommandResponse`
/// (0x11) and so on.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CommandClass {
    DiscoveryCommand = 0x10,
    DiscoveryCommandResponse = 0x11,
    GetCommand = 0x20,
    GetCommandResponse = 0x21,
    SetCommand = 0x30,
    SetCommandResponse = 0x31,
}

impl CommandClass {
    /// True for the classes a controller may place in a request.
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            Self::DiscoveryCommand | Self::GetCommand | Self::SetCommand
        )
    }

    /// Returns the response class a responder answers this request class
    /// with, or `None` if this already is a response class.
    pub fn response_class(&self) -> Option<CommandClass> {
        match self {
            Self::DiscoveryCommand => Some(Self::DiscoveryCommandResponse),
            Self::GetCommand => Some(Self::GetCommandResponse),
            Self::SetCommand => Some(Self::SetCommandResponse),
            _ => None,
        }
    }
}

impl TryFrom<u8> for CommandClass {
    type Error = ();

    /// Tries to parse a CommandClass from its wire value.
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x10 => Ok(Self::DiscoveryCommand),
            0x11 => Ok(Self::DiscoveryCommandResponse),
            0x20 => Ok(Self::GetCommand),
            0x21 => Ok(Self::GetCommandResponse),
            0x30 => Ok(Self::SetCommand),
            0x31 => Ok(Self::SetCommandResponse),
            _ => Err(()),
        }
    }
}
