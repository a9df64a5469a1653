//! Schema fingerprints over Parsing Canonical Form bytes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use md5::Md5;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Fingerprint of the empty buffer and the seed of the Rabin table.
pub const EMPTY: u64 = 0xc15d_213a_a4d7_a795;

static FP_TABLE: Lazy<[u64; 256]> = Lazy::new(|| {
    let mut table = [0u64; 256];
    for (i, slot) in table.iter_mut().enumerate() {
        let mut fp = i as u64;
        for _ in 0..8 {
            fp = (fp >> 1) ^ (EMPTY & 0u64.wrapping_sub(fp & 1));
        }
        *slot = fp;
    }
    table
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    #[default]
    Sha256,
    Md5,
    Rabin,
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(Algorithm::Sha256),
            "md5" => Ok(Algorithm::Md5),
            "rabin" | "crc64avro" => Ok(Algorithm::Rabin),
            other => Err(format!("unknown fingerprint algorithm {other}")),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Algorithm::Sha256 => "sha256",
            Algorithm::Md5 => "md5",
            Algorithm::Rabin => "rabin",
        })
    }
}

/// 64-bit Rabin fingerprint (CRC-64-AVRO).
pub fn rabin64(data: &[u8]) -> u64 {
    let table = &*FP_TABLE;
    data.iter().fold(EMPTY, |fp, &b| {
        (fp >> 8) ^ table[((fp ^ b as u64) & 0xff) as usize]
    })
}

/// Digest of canonical schema text. Rabin digests are big-endian.
pub fn fingerprint(pcf: &str, algorithm: Algorithm) -> Vec<u8> {
    let bytes = pcf.as_bytes();
    match algorithm {
        Algorithm::Sha256 => Sha256::digest(bytes).to_vec(),
        Algorithm::Md5 => Md5::digest(bytes).to_vec(),
        Algorithm::Rabin => rabin64(bytes).to_be_bytes().to_vec(),
    }
}

pub fn fingerprint_base64(pcf: &str, algorithm: Algorithm) -> String {
    STANDARD.encode(fingerprint(pcf, algorithm))
}

pub fn fingerprint_hex(pcf: &str, algorithm: Algorithm) -> String {
    hex::encode(fingerprint(pcf, algorithm))
}
