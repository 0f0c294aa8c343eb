//! Module sanity checks
//!
//! Before a payload reaches the host we make sure it is a WebAssembly
//! binary at all: magic number, version 1, and section framing that stays
//! inside the buffer. Anything deeper is the host's job.

/// WASM magic number: \0asm
const WASM_MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6D];

/// WASM version 1
const WASM_VERSION: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

/// Check that `bytes` look like a WebAssembly module
///
/// Returns a human-readable reason on failure.
pub fn validate_module(bytes: &[u8]) -> Result<(), String> {
    if bytes.len() < 8 {
        return Err("module too small".to_string());
    }

    if bytes[0..4] != WASM_MAGIC {
        return Err("invalid magic number".to_string());
    }

    if bytes[4..8] != WASM_VERSION {
        return Err("unsupported WASM version".to_string());
    }

    let mut offset = 8;
    while offset < bytes.len() {
        // Section id byte
        offset += 1;

        let (size, size_bytes) = read_leb128(bytes.get(offset..).unwrap_or(&[]))?;
        offset += size_bytes;

        let section_end = offset
            .checked_add(size as usize)
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| "section extends past end of module".to_string())?;
        offset = section_end;
    }

    Ok(())
}

/// Read an unsigned LEB128 value
fn read_leb128(bytes: &[u8]) -> Result<(u32, usize), String> {
    let mut result = 0u32;
    let mut shift = 0;
    let mut bytes_read = 0;

    for &byte in bytes.iter().take(5) {
        bytes_read += 1;
        result |= ((byte & 0x7F) as u32) << shift;
        if byte & 0x80 == 0 {
            return Ok((result, bytes_read));
        }
        shift += 7;
    }

    Err("invalid LEB128".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: [u8; 8] = [0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00];

    #[test]
    fn test_empty_module_is_valid() {
        assert_eq!(validate_module(&HEADER), Ok(()));
    }

    #[test]
    fn test_module_with_section() {
        let mut bytes = HEADER.to_vec();
        // Custom section, 3 bytes: name length 2, "hi"
        bytes.extend_from_slice(&[0x00, 0x03, 0x02, b'h', b'i']);
        assert_eq!(validate_module(&bytes), Ok(()));
    }

    #[test]
    fn test_rejects_non_modules() {
        assert_eq!(validate_module(b"\0asm"), Err("module too small".to_string()));
        assert_eq!(
            validate_module(b"#include <iostream>"),
            Err("invalid magic number".to_string())
        );

        let mut v2 = HEADER;
        v2[4] = 2;
        assert_eq!(validate_module(&v2), Err("unsupported WASM version".to_string()));
    }

    #[test]
    fn test_rejects_truncated_section() {
        let mut bytes = HEADER.to_vec();
        bytes.extend_from_slice(&[0x01, 0x10, 0x00]);
        assert_eq!(
            validate_module(&bytes),
            Err("section extends past end of module".to_string())
        );
    }

    #[test]
    fn test_rejects_huge_section_size() {
        let mut bytes = HEADER.to_vec();
        // Section size u32::MAX
        bytes.extend_from_slice(&[0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x0F, 0x00]);
        assert_eq!(
            validate_module(&bytes),
            Err("section extends past end of module".to_string())
        );
    }

    #[test]
    fn test_leb128() {
        assert_eq!(read_leb128(&[0x05]), Ok((5, 1)));
        assert_eq!(read_leb128(&[0xE5, 0x8E, 0x26]), Ok((624485, 3)));
        assert!(read_leb128(&[0x80, 0x80]).is_err());
    }
}
