//! Control channel numbering.
//!
//! The device stores the fan block before the pump block, while consumers
//! number the pump first. `ControlChannel` is the protocol order and is the
//! only type allowed to index protocol arrays. `Channel` is what users see.

use crate::error::{D5NextError, Result};

/// Number of control channels on the device.
pub const NUM_CHANNELS: usize = 2;

/// Protocol-level channel, in the order the control report stores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlChannel {
    Fan = 0,
    Pump = 1,
}

impl ControlChannel {
    pub const ALL: [ControlChannel; NUM_CHANNELS] = [ControlChannel::Fan, ControlChannel::Pump];

    /// Index into protocol arrays.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Consumer-facing channel for this protocol channel.
    pub const fn external(self) -> Channel {
        match self {
            ControlChannel::Fan => Channel::Fan,
            ControlChannel::Pump => Channel::Pump,
        }
    }
}

/// Consumer-facing channel: pump is channel 0, fan is channel 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Pump channel (external number 0).
    Pump = 0,
    /// Fan channel (external number 1).
    Fan = 1,
}

impl Channel {
    pub const ALL: [Channel; NUM_CHANNELS] = [Channel::Pump, Channel::Fan];

    /// Parse an external channel number.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for anything other than 0 or 1.
    pub fn from_number(number: u32) -> Result<Self> {
        match number {
            0 => Ok(Channel::Pump),
            1 => Ok(Channel::Fan),
            other => Err(D5NextError::InvalidArgument(format!(
                "channel {} out of range (0=pump, 1=fan)",
                other
            ))),
        }
    }

    /// External channel number.
    pub const fn number(self) -> u32 {
        self as u32
    }

    /// Protocol channel for this consumer channel.
    pub const fn internal(self) -> ControlChannel {
        match self {
            Channel::Pump => ControlChannel::Pump,
            Channel::Fan => ControlChannel::Fan,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Pump => f.pad("Pump"),
            Channel::Fan => f.pad("Fan"),
        }
    }
}

impl std::fmt::Display for ControlChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.external().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_is_bijective() {
        for number in 0..NUM_CHANNELS as u32 {
            let channel = Channel::from_number(number).unwrap();
            assert_eq!(channel.internal().external(), channel);
            assert_eq!(channel.number(), number);
        }
        for internal in ControlChannel::ALL {
            assert_eq!(internal.external().internal(), internal);
        }
    }

    #[test]
    fn test_numbering_is_swapped() {
        assert_eq!(Channel::from_number(0).unwrap().internal(), ControlChannel::Pump);
        assert_eq!(Channel::from_number(1).unwrap().internal(), ControlChannel::Fan);
        assert_eq!(ControlChannel::Fan.index(), 0);
        assert_eq!(ControlChannel::Pump.index(), 1);
    }

    #[test]
    fn test_undefined_channel_rejected() {
        assert!(matches!(
            Channel::from_number(2),
            Err(D5NextError::InvalidArgument(_))
        ));
        assert!(Channel::from_number(u32::MAX).is_err());
    }
}
