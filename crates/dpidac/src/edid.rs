// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! EDID synthesis
//!
//! The bridge has no DDC channel, so the EDID handed to the display pipeline
//! is built from scratch: an EDID 1.4 base block describing an analog
//! display, followed by one CTA-861 extension whose Video Data Block lists
//! the four baseline CEA modes with the preferred one flagged native.
//!
//! Layout of the base block (offsets in bytes):
//!
//! | Offset | Size | Content |
//! |--------|------|---------|
//! | 0x00 | 8 | Header `00 FF FF FF FF FF FF 00` |
//! | 0x08 | 2 | Vendor ID, three 5-bit letters, big-endian |
//! | 0x0A | 2 | Product code, little-endian |
//! | 0x0C | 4 | Serial number, little-endian |
//! | 0x10 | 2 | Week, year - 1990 |
//! | 0x12 | 2 | Version 1, revision 4 |
//! | 0x14 | 5 | Analog input, size unknown, gamma 2.2, features |
//! | 0x19 | 10 | Chromaticity (unset) |
//! | 0x23 | 3 | Established timings |
//! | 0x26 | 16 | Standard timings (unused) |
//! | 0x36 | 72 | Descriptors: product name + three empty slots |
//! | 0x7E | 1 | Extension count |
//! | 0x7F | 1 | Checksum |

use std::fmt;

use crate::catalog::CEA_BASELINE;
use crate::mode::DesiredModeSpec;
use crate::Error;

/// Size of one EDID block
pub const EDID_BLOCK_SIZE: usize = 128;

/// Size of the synthesized EDID (base block + one extension)
pub const EDID_SIZE: usize = 2 * EDID_BLOCK_SIZE;

/// Longest display name that fits a product name descriptor
pub const DISPLAY_NAME_MAX: usize = 13;

/// VIC advertised as native when the preferred label is not a CEA mode
pub const DEFAULT_NATIVE_VIC: u8 = 16;

const EDID_HEADER: [u8; 8] = [0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00];

const OFFSET_VENDOR: usize = 0x08;
const OFFSET_PRODUCT: usize = 0x0A;
const OFFSET_SERIAL: usize = 0x0C;
const OFFSET_WEEK: usize = 0x10;
const OFFSET_YEAR: usize = 0x11;
const OFFSET_VERSION: usize = 0x12;
const OFFSET_REVISION: usize = 0x13;
const OFFSET_INPUT: usize = 0x14;
const OFFSET_GAMMA: usize = 0x17;
const OFFSET_FEATURES: usize = 0x18;
const OFFSET_ESTABLISHED: usize = 0x23;
const OFFSET_STANDARD: usize = 0x26;
const OFFSET_DESCRIPTORS: usize = 0x36;
const OFFSET_EXTENSION_COUNT: usize = 0x7E;
const OFFSET_CHECKSUM: usize = 0x7F;

const STANDARD_TIMING_SLOTS: usize = 8;
const DESCRIPTOR_SIZE: usize = 18;

const EDID_VERSION: u8 = 1;
const EDID_REVISION: u8 = 4;
const YEAR_BASE: u16 = 1990;

/// Analog input, 0.7/0.3 V levels, separate H/V sync supported
const INPUT_ANALOG_SEPARATE_SYNC: u8 = 0x08;
/// (gamma * 100) - 100 for gamma 2.2
const GAMMA_2_2: u8 = 120;
/// RGB colour display, preferred timing mode is native
const FEATURES_RGB_PREFERRED: u8 = 0x0A;

// Established timings I and II (0x23, 0x24) and manufacturer timings (0x25)
const EST_720X400_70: u8 = 0x80;
const EST_640X480_60: u8 = 0x20;
const EST_640X480_75: u8 = 0x04;
const EST_800X600_60: u8 = 0x01;
const EST_800X600_75: u8 = 0x40;
const EST_1024X768_60: u8 = 0x08;
const EST_1024X768_70: u8 = 0x04;
const EST_1024X768_75: u8 = 0x02;

const ESTABLISHED_TIMINGS: [u8; 3] = [
    EST_720X400_70 | EST_640X480_60 | EST_640X480_75 | EST_800X600_60,
    EST_800X600_75 | EST_1024X768_60 | EST_1024X768_70 | EST_1024X768_75,
    0x00,
];

const DESCRIPTOR_PRODUCT_NAME: u8 = 0xFC;

// CTA-861 extension
const CTA_EXTENSION_TAG: u8 = 0x02;
const CTA_REVISION: u8 = 0x03;
const CTA_OFFSET_DTD: usize = 2;
const CTA_OFFSET_FLAGS: usize = 3;
const CTA_OFFSET_DATA_BLOCKS: usize = 4;
const CTA_TAG_VIDEO: u8 = 0x02;
const VIC_NATIVE: u8 = 0x80;

/// Identification fields written into the base block
///
/// Fields are taken as-is; use [`DisplayIdentity::validate`] to check values
/// from untrusted configuration before synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayIdentity {
    /// Three-letter PNP vendor code, `A`-`Z`
    pub vendor: String,
    pub product_code: u16,
    pub serial: u32,
    /// Week of manufacture, 1-54, or 0 when unspecified
    pub week: u8,
    /// Year of manufacture, 1990-2245
    pub year: u16,
    /// Display product name, at most [`DISPLAY_NAME_MAX`] ASCII characters
    pub name: String,
}

impl Default for DisplayIdentity {
    fn default() -> Self {
        DisplayIdentity {
            vendor: "RPI".to_string(),
            product_code: 0x0DAC,
            serial: 0,
            week: 1,
            year: 2018,
            name: "DPIDAC".to_string(),
        }
    }
}

impl DisplayIdentity {
    /// Check that every field can be encoded without loss.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] naming the offending field.
    pub fn validate(&self) -> Result<(), Error> {
        if self.vendor.len() != 3 || !self.vendor.bytes().all(|c| c.is_ascii_uppercase()) {
            return Err(Error::InvalidIdentity(format!(
                "vendor must be three letters A-Z, got {:?}",
                self.vendor
            )));
        }
        if self.week > 54 {
            return Err(Error::InvalidIdentity(format!(
                "week must be 0-54, got {}",
                self.week
            )));
        }
        if !(YEAR_BASE..=YEAR_BASE + 255).contains(&self.year) {
            return Err(Error::InvalidIdentity(format!(
                "year must be 1990-2245, got {}",
                self.year
            )));
        }
        if self.name.len() > DISPLAY_NAME_MAX
            || !self.name.bytes().all(|c| c.is_ascii_graphic() || c == b' ')
        {
            return Err(Error::InvalidIdentity(format!(
                "name must be at most {} printable ASCII characters, got {:?}",
                DISPLAY_NAME_MAX, self.name
            )));
        }
        Ok(())
    }
}

/// Pack a three-letter vendor code into the big-endian EDID manufacturer ID.
pub fn encode_vendor_id(vendor: &str) -> u16 {
    let mut letters = vendor.bytes().chain(std::iter::repeat(b'@'));
    let mut code = || (letters.next().unwrap_or(b'@').wrapping_sub(b'@') & 0x1F) as u16;
    let (c0, c1, c2) = (code(), code(), code());
    (c0 << 10) | (c1 << 5) | c2
}

/// Unpack an EDID manufacturer ID into its three letters.
pub fn decode_vendor_id(id: u16) -> String {
    [(id >> 10) & 0x1F, (id >> 5) & 0x1F, id & 0x1F]
        .iter()
        .map(|&c| (c as u8 + b'@') as char)
        .collect()
}

/// VIC of the CEA baseline mode named by `label`, accepting both the CEA
/// shorthand (`"720p50"`) and `WIDTHxHEIGHT[@REFRESH]`.
pub fn vic_for_label(label: &str) -> Option<u8> {
    let spec = DesiredModeSpec::parse(label).ok()?;
    CEA_BASELINE
        .iter()
        .find(|cea| spec.matches(&cea.timing))
        .map(|cea| cea.vic)
}

/// Value that makes a block sum to zero modulo 256
fn block_checksum(block: &[u8]) -> u8 {
    let sum = block[..EDID_BLOCK_SIZE - 1]
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_add(b));
    0u8.wrapping_sub(sum)
}

fn block_sum(block: &[u8]) -> u8 {
    block.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

fn populate_identity(block: &mut [u8], identity: &DisplayIdentity) {
    block[OFFSET_VENDOR..OFFSET_VENDOR + 2]
        .copy_from_slice(&encode_vendor_id(&identity.vendor).to_be_bytes());
    block[OFFSET_PRODUCT..OFFSET_PRODUCT + 2]
        .copy_from_slice(&identity.product_code.to_le_bytes());
    block[OFFSET_SERIAL..OFFSET_SERIAL + 4].copy_from_slice(&identity.serial.to_le_bytes());
    block[OFFSET_WEEK] = identity.week;
    block[OFFSET_YEAR] = identity.year.saturating_sub(YEAR_BASE).min(u8::MAX as u16) as u8;
}

fn populate_display_name(descriptor: &mut [u8], name: &str) {
    descriptor[..5].copy_from_slice(&[0x00, 0x00, 0x00, DESCRIPTOR_PRODUCT_NAME, 0x00]);
    let text = &mut descriptor[5..5 + DISPLAY_NAME_MAX];
    text.fill(b' ');
    let name = name.as_bytes();
    let len = name.len().min(DISPLAY_NAME_MAX);
    text[..len].copy_from_slice(&name[..len]);
    if len < DISPLAY_NAME_MAX {
        text[len] = b'\n';
    }
}

fn populate_base_block(block: &mut [u8], identity: &DisplayIdentity) {
    block[..EDID_HEADER.len()].copy_from_slice(&EDID_HEADER);
    populate_identity(block, identity);
    block[OFFSET_VERSION] = EDID_VERSION;
    block[OFFSET_REVISION] = EDID_REVISION;
    block[OFFSET_INPUT] = INPUT_ANALOG_SEPARATE_SYNC;
    block[OFFSET_GAMMA] = GAMMA_2_2;
    block[OFFSET_FEATURES] = FEATURES_RGB_PREFERRED;
    block[OFFSET_ESTABLISHED..OFFSET_ESTABLISHED + 3].copy_from_slice(&ESTABLISHED_TIMINGS);
    // 0x01 0x01 marks an unused standard timing slot
    block[OFFSET_STANDARD..OFFSET_STANDARD + 2 * STANDARD_TIMING_SLOTS].fill(0x01);
    populate_display_name(
        &mut block[OFFSET_DESCRIPTORS..OFFSET_DESCRIPTORS + DESCRIPTOR_SIZE],
        &identity.name,
    );
    block[OFFSET_EXTENSION_COUNT] = 1;
    block[OFFSET_CHECKSUM] = block_checksum(block);
}

fn populate_cta_block(block: &mut [u8], native_vic: u8) {
    block[0] = CTA_EXTENSION_TAG;
    block[1] = CTA_REVISION;
    block[CTA_OFFSET_FLAGS] = 0;

    let vdb = &mut block[CTA_OFFSET_DATA_BLOCKS..];
    vdb[0] = (CTA_TAG_VIDEO << 5) | CEA_BASELINE.len() as u8;
    for (slot, cea) in vdb[1..].iter_mut().zip(CEA_BASELINE.iter()) {
        *slot = if cea.vic == native_vic {
            cea.vic | VIC_NATIVE
        } else {
            cea.vic
        };
    }

    // No detailed timings follow the data block collection.
    block[CTA_OFFSET_DTD] = (CTA_OFFSET_DATA_BLOCKS + 1 + CEA_BASELINE.len()) as u8;
    block[EDID_BLOCK_SIZE - 1] = block_checksum(block);
}

/// Synthesize the two-block EDID.
///
/// `preferred_label` names the mode to flag native in the CTA Video Data
/// Block (`"720p50"`, `"1920x1080@60"`, ...); anything that is not one of the
/// [`CEA_BASELINE`] modes selects [`DEFAULT_NATIVE_VIC`].
///
/// # Errors
///
/// Returns [`Error::AllocationFailure`] if the buffer cannot be allocated.
/// Nothing else in synthesis can fail.
///
/// # Example
///
/// ```
/// use dpidac::edid::{synthesize_edid, DisplayIdentity};
///
/// let edid = synthesize_edid(&DisplayIdentity::default(), "720p50")?;
/// assert!(edid.is_valid());
/// assert_eq!(edid.native_vic(), Some(19));
/// assert_eq!(edid.vendor(), "RPI");
/// # Ok::<(), dpidac::Error>(())
/// ```
pub fn synthesize_edid(
    identity: &DisplayIdentity,
    preferred_label: &str,
) -> Result<EdidBlob, Error> {
    let native_vic = vic_for_label(preferred_label).unwrap_or_else(|| {
        log::warn!(
            "preferred mode {:?} is not a CEA baseline mode, advertising VIC {} as native",
            preferred_label,
            DEFAULT_NATIVE_VIC
        );
        DEFAULT_NATIVE_VIC
    });

    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(EDID_SIZE)
        .map_err(|_| Error::AllocationFailure)?;
    bytes.resize(EDID_SIZE, 0);

    let (base, extension) = bytes.split_at_mut(EDID_BLOCK_SIZE);
    populate_base_block(base, identity);
    populate_cta_block(extension, native_vic);

    log::debug!(
        "synthesized EDID for {} {:04x}, native VIC {}",
        identity.vendor,
        identity.product_code,
        native_vic
    );

    Ok(EdidBlob {
        bytes: bytes.into_boxed_slice(),
    })
}

/// A synthesized 256-byte EDID
#[derive(Clone, PartialEq, Eq)]
pub struct EdidBlob {
    bytes: Box<[u8]>,
}

impl EdidBlob {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn base_block(&self) -> &[u8] {
        &self.bytes[..EDID_BLOCK_SIZE]
    }

    pub fn extension_block(&self) -> &[u8] {
        &self.bytes[EDID_BLOCK_SIZE..]
    }

    /// Whether the header and both block checksums are correct
    pub fn is_valid(&self) -> bool {
        self.bytes.len() == EDID_SIZE
            && self.bytes[..EDID_HEADER.len()] == EDID_HEADER
            && block_sum(self.base_block()) == 0
            && block_sum(self.extension_block()) == 0
    }

    pub fn vendor(&self) -> String {
        decode_vendor_id(u16::from_be_bytes([
            self.bytes[OFFSET_VENDOR],
            self.bytes[OFFSET_VENDOR + 1],
        ]))
    }

    /// Display name from the product name descriptor
    pub fn display_name(&self) -> Option<String> {
        let descriptor = &self.bytes[OFFSET_DESCRIPTORS..OFFSET_DESCRIPTORS + DESCRIPTOR_SIZE];
        if descriptor[..4] != [0x00, 0x00, 0x00, DESCRIPTOR_PRODUCT_NAME] {
            return None;
        }
        let text = &descriptor[5..];
        let end = text.iter().position(|&c| c == b'\n').unwrap_or(text.len());
        Some(String::from_utf8_lossy(&text[..end]).trim_end().to_string())
    }

    /// VICs of the Video Data Block with their native flag, in block order
    pub fn vics(&self) -> Vec<(u8, bool)> {
        let ext = self.extension_block();
        let header = ext[CTA_OFFSET_DATA_BLOCKS];
        if header >> 5 != CTA_TAG_VIDEO {
            return Vec::new();
        }
        let len = (header & 0x1F) as usize;
        ext[CTA_OFFSET_DATA_BLOCKS + 1..CTA_OFFSET_DATA_BLOCKS + 1 + len]
            .iter()
            .map(|&b| (b & !VIC_NATIVE, b & VIC_NATIVE != 0))
            .collect()
    }

    /// The VIC flagged native, if any
    pub fn native_vic(&self) -> Option<u8> {
        self.vics()
            .into_iter()
            .find(|&(_, native)| native)
            .map(|(vic, _)| vic)
    }
}

impl AsRef<[u8]> for EdidBlob {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for EdidBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdidBlob")
            .field("vendor", &self.vendor())
            .field("name", &self.display_name())
            .field("native_vic", &self.native_vic())
            .field("len", &self.bytes.len())
            .finish()
    }
}
