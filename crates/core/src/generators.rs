//! Format-preserving random value generators.
//!
//! Every generator takes the random source as a parameter so callers (and tests)
//! control determinism. Generators never fail; requested lengths are clamped to
//! at least one character.

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use crate::model::{StoreValue, ValueFormat};

const SERIAL_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const HEX_ALPHABET: &[u8] = b"0123456789ABCDEF";

pub const DEFAULT_SERIAL_LEN: usize = 20;
pub const HOST_NAME_PREFIX: &str = "DESKTOP-";
const HOST_NAME_SUFFIX_LEN: usize = 8;

pub const MANUFACTURERS: &[&str] =
    &["Dell Inc.", "Lenovo", "HP", "ASUS", "Acer", "MSI", "Gigabyte Technology Co."];
pub const BIOS_VENDORS: &[&str] =
    &["American Megatrends Inc.", "Phoenix Technologies", "Insyde Corp.", "Award Software"];

/// Six random octets as 12 uppercase hex digits; the first octet is unicast and
/// locally administered.
pub fn mac_address<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut octets = [0u8; 6];
    rng.fill_bytes(&mut octets);
    octets[0] = (octets[0] & 0xFE) | 0x02;
    crate::model::to_hex(&octets)
}

/// Uppercase base-36 serial of `len` characters.
pub fn serial<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    pick(rng, SERIAL_ALPHABET, len)
}

/// Uppercase hex string of exactly `len` characters.
pub fn hex<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    pick(rng, HEX_ALPHABET, len)
}

fn pick<R: Rng + ?Sized>(rng: &mut R, alphabet: &[u8], len: usize) -> String {
    (0..len.max(1)).map(|_| char::from(alphabet[rng.gen_range(0..alphabet.len())])).collect()
}

/// Random version-4 GUID in canonical dashed lowercase form.
pub fn guid<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    uuid::Builder::from_random_bytes(bytes).into_uuid().hyphenated().to_string()
}

pub fn braced_guid<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{{{}}}", guid(rng))
}

/// `DESKTOP-` followed by eight base-36 characters.
pub fn host_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{HOST_NAME_PREFIX}{}", serial(rng, HOST_NAME_SUFFIX_LEN))
}

/// Four groups of five decimal digits.
pub fn product_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..4).map(|_| format!("{:05}", rng.gen_range(0..100_000u32))).collect::<Vec<_>>().join("-")
}

/// `MM/DD/YYYY` between 2020 and 2025; the day never exceeds 28 so every month is valid.
pub fn bios_date<R: Rng + ?Sized>(rng: &mut R) -> String {
    let month = rng.gen_range(1..=12u32);
    let day = rng.gen_range(1..=28u32);
    let year = rng.gen_range(2020..=2025u32);
    format!("{month:02}/{day:02}/{year}")
}

pub fn manufacturer<R: Rng + ?Sized>(rng: &mut R) -> String {
    MANUFACTURERS.choose(rng).copied().unwrap_or("Dell Inc.").to_string()
}

pub fn bios_vendor<R: Rng + ?Sized>(rng: &mut R) -> String {
    BIOS_VENDORS.choose(rng).copied().unwrap_or("American Megatrends Inc.").to_string()
}

/// Seconds since the epoch, between 30 and 364 days before `now`.
pub fn install_date<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> u32 {
    let days_ago = rng.gen_range(30..365i64);
    let ts = (now - Duration::days(days_ago)).timestamp();
    u32::try_from(ts.max(0)).unwrap_or(u32::MAX)
}

/// Blob of the same length as `original` whose first four bytes (the length
/// header consumers check) are kept verbatim.
pub fn header_blob<R: Rng + ?Sized>(rng: &mut R, original: &[u8]) -> Vec<u8> {
    let len = original.len().max(1);
    let mut blob = vec![0u8; len];
    rng.fill_bytes(&mut blob);
    let keep = original.len().min(4);
    blob[..keep].copy_from_slice(&original[..keep]);
    blob
}

/// Serial shaped like `original`: same length (capped at `max_len`, empty means
/// `max_len`) and hex-only when the original is hex-only.
pub fn serial_like<R: Rng + ?Sized>(rng: &mut R, original: &str, max_len: usize) -> String {
    let trimmed = original.trim();
    let len = match trimmed.chars().count() {
        0 => max_len,
        n => n.min(max_len),
    };
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        hex(rng, len)
    } else {
        serial(rng, len)
    }
}

/// Produce a replacement value for a field of `format`, shaped after `original`.
pub fn generate(
    format: &ValueFormat,
    original: Option<&StoreValue>,
    rng: &mut dyn RngCore,
) -> StoreValue {
    let original_text = original.map(StoreValue::to_display_string).unwrap_or_default();
    match format {
        ValueFormat::Guid => {
            let value = guid(rng);
            if original_text.trim_start().starts_with('{') {
                StoreValue::Text(format!("{{{value}}}"))
            } else {
                StoreValue::Text(value)
            }
        }
        ValueFormat::BracedGuid => StoreValue::Text(braced_guid(rng)),
        ValueFormat::MacAddress => StoreValue::Text(mac_address(rng)),
        ValueFormat::Serial { len } => StoreValue::Text(serial(rng, *len)),
        ValueFormat::SerialLike { max_len } => {
            StoreValue::Text(serial_like(rng, &original_text, *max_len))
        }
        ValueFormat::Hex { len } => StoreValue::Text(hex(rng, *len)),
        ValueFormat::HostName => StoreValue::Text(host_name(rng)),
        ValueFormat::ProductId => StoreValue::Text(product_id(rng)),
        ValueFormat::BiosDate => StoreValue::Text(bios_date(rng)),
        ValueFormat::Manufacturer => StoreValue::Text(manufacturer(rng)),
        ValueFormat::BiosVendor => StoreValue::Text(bios_vendor(rng)),
        ValueFormat::SystemProduct => {
            StoreValue::Text(format!("System Product {}", serial(rng, 6)))
        }
        ValueFormat::SystemVersion => StoreValue::Text(format!(
            "v{}.{:02}",
            rng.gen_range(1..9u32),
            rng.gen_range(0..99u32)
        )),
        ValueFormat::BiosVersion => {
            StoreValue::Text(format!("{}.{}", serial(rng, 4), rng.gen_range(100..999u32)))
        }
        ValueFormat::BoardProduct => StoreValue::Text(format!("BASE-{}", serial(rng, 8))),
        ValueFormat::BoardVersion => StoreValue::Text(format!(
            "Rev {}.0{}",
            rng.gen_range(1..9u32),
            rng.gen_range(0..9u32)
        )),
        ValueFormat::InstallDate => StoreValue::Dword(install_date(rng, Utc::now())),
        ValueFormat::HeaderBlob => match original {
            Some(StoreValue::Binary(bytes)) => StoreValue::Binary(header_blob(rng, bytes)),
            _ => StoreValue::Binary(header_blob(rng, &[])),
        },
        ValueFormat::Opaque => match original {
            Some(value) => value.clone(),
            None => StoreValue::Text(serial(rng, DEFAULT_SERIAL_LEN)),
        },
    }
}
