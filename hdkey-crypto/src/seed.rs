//! Packs a `u64` counter into a three level hardened derivation path.
//!
//! The seed bits are split into three sections `(b63-b32|b31-b2|b1-b0)`. Each
//! section is hardened by adding `2^31` and the raw sums are joined with `/`, so
//! the text carries no `'` marker. All arithmetic wraps; decoding a path produced
//! by [`seed_to_path`] yields the original seed for every `u64`.
use crate::error::Error;

const HARDENED_OFFSET: u32 = 1 << 31;
const SEPARATOR: char = '/';

/// Returns the hardened three level path encoding `seed`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn seed_to_path(seed: u64) -> String {
    // the shifts and the mask leave at most 32 significant bits
    let first = ((seed >> 32) as u32).wrapping_add(HARDENED_OFFSET);
    let second = (((seed << 32) >> 34) as u32).wrapping_add(HARDENED_OFFSET);
    let third = ((seed & 0b11) as u32).wrapping_add(HARDENED_OFFSET);
    format!("{first}{SEPARATOR}{second}{SEPARATOR}{third}")
}

/// Returns the seed a path of the form `d1/d2/d3` was generated from.
///
/// # Errors
///
/// Returns [`Error::MalformedPath`] unless the path has exactly three segments and
/// [`Error::SegmentParse`] if a segment is not an unsigned 32-bit decimal.
pub fn path_to_seed(path: &str) -> Result<u64, Error> {
    let segments: Vec<&str> = path.split(SEPARATOR).collect();
    let [first, second, third] = segments.as_slice() else {
        return Err(Error::MalformedPath { path: path.into() });
    };
    let offset = u64::from(HARDENED_OFFSET);
    let first = u64::from(parse_segment(first)?).wrapping_sub(offset);
    let second = u64::from(parse_segment(second)?).wrapping_sub(offset);
    let third = u64::from(parse_segment(third)?).wrapping_sub(offset);
    Ok((first << 32).wrapping_add(second << 2).wrapping_add(third))
}

fn parse_segment(segment: &str) -> Result<u32, Error> {
    // `u32::from_str` accepts a leading `+`
    if segment.is_empty() || !segment.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(Error::SegmentParse { segment: segment.into() });
    }
    segment.parse().map_err(|_| Error::SegmentParse { segment: segment.into() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MAX_INT32: u64 = i32::MAX as u64;

    #[test]
    fn seed_paths() {
        let tests = [
            (0, "2147483648/2147483648/2147483648"),
            (172_732_732, "2147483648/2190666831/2147483648"),
            (MAX_INT32 + 172_732_732, "2147483648/2727537742/2147483651"),
            (MAX_INT32 * 10_000 + 172_732_732, "2147488648/2190664331/2147483648"),
            (MAX_INT32 * MAX_INT32 + 172_732_732, "3221225471/2190666831/2147483649"),
            (
                MAX_INT32 * MAX_INT32 + MAX_INT32 * 100 + 172_732_732,
                "3221225521/2190666806/2147483649",
            ),
            (MAX_INT32 * MAX_INT32 + MAX_INT32 * 2 + 172_732_732, "3221225472/2190666830/2147483651"),
            (u64::MAX, "2147483647/3221225471/2147483651"),
        ];
        for (seed, path) in tests {
            assert_eq!(seed_to_path(seed), path, "{seed}");
            assert_eq!(path_to_seed(path).unwrap(), seed, "{path}");
        }
    }

    #[test]
    fn wrong_level_count() {
        for path in ["", "0/0", "0/0/0/0", "/"] {
            let err = path_to_seed(path).unwrap_err();
            assert!(matches!(err, Error::MalformedPath { path: p } if p == path), "{path:?}");
        }
    }

    #[test]
    fn underflow_wraps() {
        assert_eq!(path_to_seed("0/0/0").unwrap(), 9_223_372_026_117_357_568);
    }

    #[test]
    fn invalid_segments() {
        let tests = [
            ("4294967296/0/0", "4294967296"),
            ("-1/0/0", "-1"),
            ("+1/0/0", "+1"),
            ("0/x/0", "x"),
            ("0/0/", ""),
            ("0/0/1'", "1'"),
        ];
        for (path, segment) in tests {
            let err = path_to_seed(path).unwrap_err();
            assert!(
                matches!(&err, Error::SegmentParse { segment: s } if s == segment),
                "{path}: {err}"
            );
        }
    }

    proptest! {
        #[test]
        fn seed_path_round_trips(seed in any::<u64>()) {
            let path = seed_to_path(seed);
            prop_assert_eq!(path.split('/').count(), 3);
            prop_assert_eq!(path_to_seed(&path).ok(), Some(seed));
        }

        #[test]
        fn small_seeds_stay_hardened(seed in 0..(1u64 << 63)) {
            for segment in seed_to_path(seed).split('/') {
                prop_assert!(segment.parse::<u32>().unwrap() >= HARDENED_OFFSET);
            }
        }
    }
}
