//! Base58Check encoding with a double SHA256 checksum.
use crate::error::Base58CheckError;
use sha2::Digest;

const CHECKSUM_LEN: usize = 4;

/// Returns `SHA256(SHA256(data))`.
#[must_use]
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    let digest = sha2::Sha256::digest(sha2::Sha256::digest(data));
    let mut hash = [0; 32];
    hash.copy_from_slice(&digest);
    hash
}

/// Returns `RIPEMD160(SHA256(data))`.
#[must_use]
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha2 = sha2::Sha256::digest(data);
    let ripemd = ripemd::Ripemd160::digest(sha2);
    let mut hash = [0; 20];
    hash.copy_from_slice(&ripemd);
    hash
}

/// First four bytes of `sha256d(payload)`.
#[must_use]
pub fn checksum(payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let hash = sha256d(payload);
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Encodes `payload` followed by its checksum in the bitcoin base58 alphabet.
#[must_use]
pub fn encode(payload: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(payload.len() + CHECKSUM_LEN);
    bytes.extend_from_slice(payload);
    bytes.extend_from_slice(&checksum(payload));
    bs58::encode(bytes).with_alphabet(bs58::Alphabet::BITCOIN).into_string()
}

/// Decodes a Base58Check string and returns the payload without its checksum.
///
/// # Errors
///
/// Returns `Err` if the string is not base58, is too short to carry a checksum or
/// the checksum doesn't match.
pub fn decode(encoded: &str) -> Result<Vec<u8>, Base58CheckError> {
    let mut bytes = bs58::decode(encoded)
        .with_alphabet(bs58::Alphabet::BITCOIN)
        .into_vec()
        .map_err(|_| Base58CheckError::FailedToDecode)?;
    if bytes.len() < CHECKSUM_LEN {
        return Err(Base58CheckError::InvalidFormat);
    }
    let expected = bytes.split_off(bytes.len() - CHECKSUM_LEN);
    if expected[..] != checksum(&bytes)[..] {
        return Err(Base58CheckError::InvalidChecksum);
    }
    Ok(bytes)
}
