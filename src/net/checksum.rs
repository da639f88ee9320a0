//! Internet checksum (RFC 1071).
//!
//! The checksum is the 16 bit one's complement of the one's complement sum of
//! all 16 bit words in the input. Both the IPv4 header checksum and the UDP
//! checksum are computed this way.

/// Computes the Internet checksum of `buf`.
///
/// If `buf` contains an odd number of octets, the last octet is padded on the
/// right with zeros to form a 16 bit word.
///
/// A computed checksum of zero is returned as `0xFFFF`, its one's complement
/// equivalent. From RFC 768, an all zero transmitted checksum means the
/// transmitter generated no checksum.
pub fn checksum(buf: &[u8]) -> u16 {
    checksum_iter(buf.iter().copied())
}

/// Computes the Internet checksum over a stream of bytes.
///
/// Equivalent to [checksum] over the concatenation of every byte produced by
/// `bytes`, which allows chaining header and payload slices without copying
/// them into a single buffer.
pub fn checksum_iter<I>(bytes: I) -> u16
where
    I: IntoIterator<Item = u8>,
{
    let mut bytes = bytes.into_iter();
    let mut sum = 0u32;

    loop {
        let word = match (bytes.next(), bytes.next()) {
            (Some(h), Some(l)) => u16::from_be_bytes([h, l]),
            (Some(h), None) => u16::from_be_bytes([h, 0x00]),
            _ => break,
        };

        sum += word as u32;

        // Fold on every add so the accumulator can never overflow, whatever
        // the input length.
        if sum > 0xFFFF {
            sum = (sum & 0xFFFF) + (sum >> 16);
        }
    }

    while sum > 0xFFFF {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    match !(sum as u16) {
        0 => 0xFFFF,
        csum => csum,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn checksum_never_zero(buf in prop::collection::vec(any::<u8>(), 0..2048)) {
            prop_assert_ne!(checksum(&buf), 0);
        }

        #[test]
        fn checksum_odd_length_matches_zero_padded(
            buf in prop::collection::vec(any::<u8>(), 0..2048)
                .prop_filter("odd length", |b| b.len() % 2 == 1)
        ) {
            let mut padded = buf.clone();
            padded.push(0);

            prop_assert_eq!(checksum(&buf), checksum(&padded));
        }

        #[test]
        fn checksum_iter_matches_slice(
            a in prop::collection::vec(any::<u8>(), 0..512),
            b in prop::collection::vec(any::<u8>(), 0..512),
        ) {
            let joined: Vec<u8> = a.iter().chain(b.iter()).copied().collect();

            prop_assert_eq!(
                checksum(&joined),
                checksum_iter(a.iter().chain(b.iter()).copied())
            );
        }
    }

    #[test]
    fn checksum_ipv4_header_reference() {
        // Captured TCP/IPv4 header carrying 0xFA43, checksum field zeroed.
        let header: [u8; 20] = [
            0x45, 0x00, 0x00, 0x3c, 0xbe, 0xfa, 0x40, 0x00, 0x40, 0x06, 0x00, 0x00, 0xc0, 0xa8,
            0x00, 0x01, 0xc0, 0xa8, 0x00, 0x2c,
        ];

        assert_eq!(checksum(&header), 0xFA43);
    }

    #[test]
    fn checksum_empty_buffer() {
        // Sum is zero, complement is 0xFFFF.
        assert_eq!(checksum(&[]), 0xFFFF);
    }

    #[test]
    fn checksum_zero_result_transmitted_as_all_ones() {
        // 0xFFFF sums to 0xFFFF, whose complement is zero.
        assert_eq!(checksum(&[0xFF, 0xFF]), 0xFFFF);
        // 0x1234 + 0xEDCB = 0xFFFF.
        assert_eq!(checksum(&[0x12, 0x34, 0xED, 0xCB]), 0xFFFF);
    }

    #[test]
    fn checksum_carry_folding() {
        // 0xFFFF + 0x0001 = 0x10000 -> folds to 0x0001, complement 0xFFFE.
        assert_eq!(checksum(&[0xFF, 0xFF, 0x00, 0x01]), 0xFFFE);
    }

    #[test]
    fn checksum_odd_byte_is_high_byte() {
        assert_eq!(checksum(&[0x01]), !0x0100);
        assert_eq!(checksum(&[0x01]), checksum(&[0x01, 0x00]));
    }

    #[test]
    fn checksum_is_order_sensitive_across_word_boundaries() {
        assert_ne!(checksum(&[0x01, 0x02]), checksum(&[0x02, 0x01]));
    }
}
