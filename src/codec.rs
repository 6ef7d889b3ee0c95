//! Command framing and response classification

use crate::types::{bytes_to_hex, ResponseOutcome, UhfError};

const PRESET_VALUE: u16 = 0xFFFF;
const POLYNOMIAL: u16 = 0x8408;

/// Reader address that every unit answers to
pub const BROADCAST_ADDRESS: u8 = 0xFF;

/// Response bytes the reader uses to signal "no tag in range"
const NO_TAG_MARKERS: [u8; 2] = [0xFB, 0xFE];

/// Length of the tag identifier at the end of an inventory response
const UID_LEN: usize = 3;

/// CRC16 (preset 0xFFFF, reflected polynomial 0x8408) over `data`
pub fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(PRESET_VALUE, |mut crc, &byte| {
        crc ^= byte as u16;
        for _ in 0..8 {
            crc = if crc & 0x0001 != 0 {
                (crc >> 1) ^ POLYNOMIAL
            } else {
                crc >> 1
            };
        }
        crc
    })
}

/// Append the CRC16 to `command`, low byte first
pub fn encode(command: &[u8]) -> Vec<u8> {
    let crc = crc16(command);
    let mut frame = Vec::with_capacity(command.len() + 2);
    frame.extend_from_slice(command);
    frame.push((crc & 0xFF) as u8);
    frame.push((crc >> 8) as u8);
    frame
}

/// Parse a whitespace-separated hex template such as `"06 FF 01 00 06"`
pub fn parse_hex(template: &str) -> Result<Vec<u8>, UhfError> {
    let compact: String = template.split_whitespace().collect();
    hex::decode(&compact).map_err(|e| UhfError::InvalidHex {
        template: template.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a hex template and append its CRC16
pub fn encode_hex(template: &str) -> Result<Vec<u8>, UhfError> {
    parse_hex(template).map(|command| encode(&command))
}

/// Classify a raw response.
///
/// The response CRC is not checked. A non-empty response shorter than a UID
/// with no marker byte is reported as [`ResponseOutcome::CardNotDetected`].
pub fn decode(response: &[u8]) -> ResponseOutcome {
    if response.is_empty() {
        return ResponseOutcome::NoResponse;
    }
    if response.iter().any(|b| NO_TAG_MARKERS.contains(b)) {
        return ResponseOutcome::CardNotDetected;
    }
    if response.len() < UID_LEN {
        return ResponseOutcome::CardNotDetected;
    }
    ResponseOutcome::Uid(bytes_to_hex(&response[response.len() - UID_LEN..]))
}

/// Command templates for a given reader address, without checksum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSet {
    /// Inventory returning the tag TID, the command the scan loop polls with
    pub inventory_tid: Vec<u8>,
    /// Inventory returning the EPC
    pub inventory_epc: Vec<u8>,
    pub read_tag_memory: Vec<u8>,
    pub write_epc: Vec<u8>,
    pub set_address: Vec<u8>,
}

impl CommandSet {
    pub fn new(address: u8) -> Result<Self, UhfError> {
        let addr = format!("{:02X}", address);
        Ok(Self {
            inventory_tid: parse_hex(&format!("06 {} 01 00 06", addr))?,
            inventory_epc: parse_hex(&format!("04 {} 0F", addr))?,
            read_tag_memory: parse_hex(&format!(
                "12 {} 02 02 11 22 33 44 01 00 04 00 00 00 00 00 02",
                addr
            ))?,
            write_epc: parse_hex("0F 03 04 03 00 00 00 00 11 22 33 44 55 66")?,
            set_address: parse_hex("05 03 24 00")?,
        })
    }

    /// Framed inventory command, ready to write
    pub fn inventory_frame(&self) -> Vec<u8> {
        encode(&self.inventory_tid)
    }
}
