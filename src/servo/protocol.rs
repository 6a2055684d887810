// Serial protocol spoken by the servo controller board
//
// The board runs the easing/interpolation timer; we only send it orders.
// Packet format: [0xFF, 0xFF, Length, Order, Params..., Checksum]
// Length counts order + params + checksum. The checksum is the inverted low
// byte of the sum of Length, Order and Params.
// Replies share the format with a status byte in place of the order.

use serialport::{self, SerialPort};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::debug;

use crate::motion::{JOINT_COUNT, JointIndex, JointRange};

/// Default serial configuration for the servo board
pub const DEFAULT_BAUDRATE: u32 = 115_200;
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

/// Packet header bytes
const HEADER: [u8; 2] = [0xFF, 0xFF];

/// Order set understood by the board
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ping = 0x01,
    Attach = 0x02,     // joint, start angle (i16)
    Limits = 0x03,     // joint, min (i16), max (i16)
    Easing = 0x04,     // easing type (u8)
    Speed = 0x05,      // degrees per second (u16)
    Targets = 0x83,    // 8 x target angle (i16), no reply
}

/// Easing curves supported by the board's interpolation timer
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    #[default]
    Linear = 0,
    Quadratic = 1,
    Cubic = 2,
    Sine = 3,
    Circular = 4,
}

/// Error types for servo board communication
#[derive(Debug, thiserror::Error)]
pub enum ServoError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid response to {order:?}: {reason}")]
    InvalidResponse { order: Order, reason: String },

    #[error("Checksum mismatch in response to {order:?}")]
    ChecksumMismatch { order: Order },

    #[error("Board rejected {order:?} with status 0x{status:02X}")]
    BoardError { order: Order, status: u8 },

    #[error("Timeout waiting for response to {order:?}")]
    Timeout { order: Order },
}

pub type Result<T> = std::result::Result<T, ServoError>;

/// Serial link to the servo board
pub struct ServoBus {
    port: Box<dyn SerialPort>,
}

impl ServoBus {
    /// Open with custom baudrate
    pub fn open_with_baudrate(port_name: &str, baudrate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .open()?;

        Ok(Self { port })
    }

    /// Calculate checksum for a packet (excluding header)
    fn checksum(data: &[u8]) -> u8 {
        let sum: u16 = data.iter().map(|&b| b as u16).sum();
        (!sum & 0xFF) as u8
    }

    /// Build a packet with header and checksum
    fn build_packet(order: Order, params: &[u8]) -> Vec<u8> {
        let length = (params.len() + 2) as u8; // order + params + checksum
        let mut packet = Vec::with_capacity(5 + params.len());

        packet.extend_from_slice(&HEADER);
        packet.push(length);
        packet.push(order as u8);
        packet.extend_from_slice(params);

        let checksum = Self::checksum(&packet[2..]);
        packet.push(checksum);

        packet
    }

    /// Wire form of an angle; the board works in signed 16-bit degrees
    fn encode_angle(angle: i32) -> [u8; 2] {
        (angle.clamp(i16::MIN as i32, i16::MAX as i32) as i16).to_le_bytes()
    }

    fn attach_params(joint: JointIndex, start: i32) -> Vec<u8> {
        let mut params = vec![joint as u8];
        params.extend_from_slice(&Self::encode_angle(start));
        params
    }

    fn limits_params(joint: JointIndex, range: &JointRange) -> Vec<u8> {
        let mut params = vec![joint as u8];
        params.extend_from_slice(&Self::encode_angle(range.min));
        params.extend_from_slice(&Self::encode_angle(range.max));
        params
    }

    fn targets_params(targets: &[i32; JOINT_COUNT]) -> Vec<u8> {
        targets
            .iter()
            .flat_map(|&angle| Self::encode_angle(angle))
            .collect()
    }

    fn send_packet(&mut self, packet: &[u8]) -> Result<()> {
        self.port.write_all(packet)?;
        self.port.flush()?;
        Ok(())
    }

    /// Read a status packet
    fn read_response(&mut self, order: Order) -> Result<Vec<u8>> {
        let mut header = [0u8; 2];
        self.port.read_exact(&mut header).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                ServoError::Timeout { order }
            } else {
                ServoError::Io(e)
            }
        })?;

        if header != HEADER {
            return Err(ServoError::InvalidResponse {
                order,
                reason: format!("Invalid header: {:02X?}", header),
            });
        }

        let mut length = [0u8; 1];
        self.port.read_exact(&mut length)?;
        let length = length[0] as usize;
        if length < 2 {
            return Err(ServoError::InvalidResponse {
                order,
                reason: format!("Length {} too short", length),
            });
        }

        // status + params + checksum
        let mut remaining = vec![0u8; length];
        self.port.read_exact(&mut remaining)?;

        let mut checksum_data = vec![length as u8];
        checksum_data.extend_from_slice(&remaining[..remaining.len() - 1]);
        if Self::checksum(&checksum_data) != remaining[remaining.len() - 1] {
            return Err(ServoError::ChecksumMismatch { order });
        }

        let status = remaining[0];
        if status != 0 {
            return Err(ServoError::BoardError { order, status });
        }

        Ok(remaining[1..remaining.len() - 1].to_vec())
    }

    /// Send an order and wait for the board's status reply
    fn request(&mut self, order: Order, params: &[u8]) -> Result<Vec<u8>> {
        let packet = Self::build_packet(order, params);
        debug!("Order {:?}: {:02X?}", order, params);
        self.send_packet(&packet)?;
        self.read_response(order)
    }

    /// Check whether the board is answering
    pub fn ping(&mut self) -> Result<bool> {
        match self.request(Order::Ping, &[]) {
            Ok(_) => Ok(true),
            Err(ServoError::Timeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Attach a joint's servo and park it at `start`
    pub fn attach(&mut self, joint: JointIndex, start: i32) -> Result<()> {
        self.request(Order::Attach, &Self::attach_params(joint, start))?;
        Ok(())
    }

    /// Install the board-side min/max constraint for a joint
    pub fn set_limits(&mut self, joint: JointIndex, range: &JointRange) -> Result<()> {
        self.request(Order::Limits, &Self::limits_params(joint, range))?;
        Ok(())
    }

    pub fn set_easing(&mut self, easing: Easing) -> Result<()> {
        self.request(Order::Easing, &[easing as u8])?;
        Ok(())
    }

    pub fn set_speed(&mut self, speed: u16) -> Result<()> {
        self.request(Order::Speed, &speed.to_le_bytes())?;
        Ok(())
    }

    /// Send all eight targets; the board starts easing toward them at once
    pub fn write_targets(&mut self, targets: &[i32; JOINT_COUNT]) -> Result<()> {
        let packet = Self::build_packet(Order::Targets, &Self::targets_params(targets));
        debug!("Targets: {:?}", targets);
        // Targets has no reply
        self.send_packet(&packet)
    }
}
