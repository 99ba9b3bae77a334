//! HTTP byte-range requests (`Range: bytes=...`).
//!
//! Only single ranges are supported. Anything that does not parse as a single
//! range is treated by callers as "no range" and the whole file is served.

/// A single byte range as written by the client, not yet checked against a file size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteRange {
    /// `bytes=start-end` or `bytes=start-` (inclusive end, open when `None`).
    FromStart { start: u64, end: Option<u64> },
    /// `bytes=-length`: the last `length` bytes.
    Suffix { length: u64 },
}

/// A range resolved against a concrete file size. Bounds are inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedRange {
    pub start: u64,
    pub end: u64,
}

impl ResolvedRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Value for the `Content-Range` response header.
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total)
    }
}

impl ByteRange {
    /// Parse a `Range` header value. Returns `None` for anything malformed,
    /// including multi-range sets and `end < start`.
    pub fn parse(header: &str) -> Option<Self> {
        let header = header.trim();
        let (unit, spec) = header.split_once('=')?;
        if !unit.trim().eq_ignore_ascii_case("bytes") {
            return None;
        }
        let spec = spec.trim();
        if spec.contains(',') {
            return None;
        }
        let (first, last) = spec.split_once('-')?;
        let (first, last) = (first.trim(), last.trim());

        if first.is_empty() {
            let length = parse_digits(last)?;
            return Some(Self::Suffix { length });
        }

        let start = parse_digits(first)?;
        let end = if last.is_empty() {
            None
        } else {
            let end = parse_digits(last)?;
            if end < start {
                return None;
            }
            Some(end)
        };
        Some(Self::FromStart { start, end })
    }

    /// Resolve against a file of `size` bytes. `None` means the range cannot be
    /// satisfied (a 416 response); an end past EOF is clamped.
    pub fn resolve(&self, size: u64) -> Option<ResolvedRange> {
        if size == 0 {
            return None;
        }
        let last = size - 1;
        match *self {
            Self::FromStart { start, end } => {
                if start > last {
                    return None;
                }
                let end = end.map_or(last, |e| e.min(last));
                Some(ResolvedRange { start, end })
            }
            Self::Suffix { length } => {
                if length == 0 {
                    return None;
                }
                Some(ResolvedRange {
                    start: size.saturating_sub(length),
                    end: last,
                })
            }
        }
    }
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_ranges() {
        assert_eq!(
            ByteRange::parse("bytes=0-99"),
            Some(ByteRange::FromStart {
                start: 0,
                end: Some(99)
            })
        );
        assert_eq!(
            ByteRange::parse("bytes=500-"),
            Some(ByteRange::FromStart {
                start: 500,
                end: None
            })
        );
        assert_eq!(
            ByteRange::parse("bytes=-256"),
            Some(ByteRange::Suffix { length: 256 })
        );
        assert_eq!(
            ByteRange::parse(" Bytes = 1 - 2 "),
            Some(ByteRange::FromStart {
                start: 1,
                end: Some(2)
            })
        );
    }

    #[test]
    fn malformed_headers_are_none() {
        for header in [
            "",
            "bytes",
            "bytes=",
            "bytes=-",
            "bytes=abc-",
            "bytes=10-5",
            "bytes=0-1,4-5",
            "items=0-5",
            "bytes=+1-2",
            "bytes=0-99999999999999999999999",
        ] {
            assert_eq!(ByteRange::parse(header), None, "{header:?}");
        }
    }

    #[test]
    fn resolves_against_size() {
        let size = 1000;
        let first = ByteRange::parse("bytes=0-99").unwrap().resolve(size).unwrap();
        assert_eq!(first, ResolvedRange { start: 0, end: 99 });
        assert_eq!(first.len(), 100);
        assert_eq!(first.content_range(size), "bytes 0-99/1000");

        let tail = ByteRange::parse("bytes=500-").unwrap().resolve(size).unwrap();
        assert_eq!(tail, ResolvedRange { start: 500, end: 999 });

        let clamped = ByteRange::parse("bytes=900-5000").unwrap().resolve(size).unwrap();
        assert_eq!(clamped, ResolvedRange { start: 900, end: 999 });

        let suffix = ByteRange::parse("bytes=-5000").unwrap().resolve(size).unwrap();
        assert_eq!(suffix, ResolvedRange { start: 0, end: 999 });
    }

    #[test]
    fn unsatisfiable_ranges() {
        assert_eq!(ByteRange::parse("bytes=1000-").unwrap().resolve(1000), None);
        assert_eq!(ByteRange::parse("bytes=-0").unwrap().resolve(1000), None);
        assert_eq!(ByteRange::parse("bytes=0-").unwrap().resolve(0), None);
    }
}
