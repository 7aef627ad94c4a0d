use serde::{Deserialize, Serialize};

use crate::error::FrameError;

/// How strictly the trailing checksum of an inbound frame is compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrcCheck {
    /// Both CRC bytes must match.
    #[default]
    Strict,
    /// Either CRC byte matching is enough. Older unit firmware relies on this.
    Lenient,
}

/// CRC-16/MODBUS (reflected polynomial 0xA001, init 0xFFFF).
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            if (crc & 0x0001) != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Appends the CRC of `frame` as low byte then high byte.
pub fn append_crc(frame: &mut Vec<u8>) {
    let crc = crc16(frame);
    frame.push((crc & 0xFF) as u8);
    frame.push((crc >> 8) as u8);
}

/// Checks the trailing two CRC bytes of `frame` against its body.
pub fn verify(frame: &[u8], check: CrcCheck) -> Result<(), FrameError> {
    if frame.len() < 3 {
        return Err(FrameError::FrameTooShort { len: frame.len() });
    }

    let (body, tail) = frame.split_at(frame.len() - 2);
    let expected = crc16(body);
    let received = u16::from_le_bytes([tail[0], tail[1]]);

    let low_ok = tail[0] == (expected & 0xFF) as u8;
    let high_ok = tail[1] == (expected >> 8) as u8;
    let accepted = match check {
        CrcCheck::Strict => low_ok && high_ok,
        CrcCheck::Lenient => low_ok || high_ok,
    };

    if accepted {
        Ok(())
    } else {
        Err(FrameError::ChecksumMismatch { expected, received })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_modbus_reference_value() {
        // Read holding registers request, well-known check value 0x0A84.
        let request = [0x01, 0x03, 0x00, 0x00, 0x00, 0x01];
        assert_eq!(crc16(&request), 0x0A84);
        assert_eq!(crc16(b"123456789"), 0x4B37);
    }

    #[test]
    fn empty_input_is_initial_value() {
        assert_eq!(crc16(&[]), 0xFFFF);
    }

    #[test]
    fn appended_crc_verifies() {
        for body in [vec![0x01], vec![0x01, 0x03, 0x14, 0x00], (0..=255).collect::<Vec<u8>>()] {
            let mut frame = body.clone();
            append_crc(&mut frame);
            assert_eq!(frame.len(), body.len() + 2);
            assert_eq!(verify(&frame, CrcCheck::Strict), Ok(()));
        }
    }

    #[test]
    fn strict_rejects_single_byte_corruption() {
        let mut frame = vec![0x01, 0x06, 0x00, 0x01, 0x00, 0x2B];
        append_crc(&mut frame);
        let last = frame.len() - 1;
        frame[last] ^= 0xFF;

        assert!(matches!(
            verify(&frame, CrcCheck::Strict),
            Err(FrameError::ChecksumMismatch { .. })
        ));
        assert_eq!(verify(&frame, CrcCheck::Lenient), Ok(()));
    }

    #[test]
    fn lenient_still_rejects_both_bytes_wrong() {
        let mut frame = vec![0x01, 0x06, 0x00, 0x01, 0x00, 0x2B];
        append_crc(&mut frame);
        let n = frame.len();
        frame[n - 1] ^= 0x01;
        frame[n - 2] ^= 0x01;

        assert!(verify(&frame, CrcCheck::Lenient).is_err());
    }

    #[test]
    fn short_frames_are_rejected() {
        assert_eq!(
            verify(&[0x01, 0x02], CrcCheck::Strict),
            Err(FrameError::FrameTooShort { len: 2 })
        );
    }
}
