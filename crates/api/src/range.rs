//! Single-range `Range` header parsing for the stream endpoint.
//!
//! Only `bytes=` ranges with a single range-spec are honored. Malformed
//! headers and multi-range requests fall back to a full 200 response, as
//! RFC 7233 permits; a syntactically valid range that lies entirely
//! outside the resource yields 416.

/// Outcome of evaluating a `Range` header against a resource length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// Serve the whole resource with 200.
    Full,
    /// Serve `start..=end` with 206.
    Partial { start: u64, end: u64 },
    /// Respond 416 with a `Content-Range: bytes */len`.
    Unsatisfiable,
}

/// Evaluate an optional `Range` header for a resource of `total` bytes.
pub fn parse_range(header: Option<&str>, total: u64) -> ByteRange {
    let Some(header) = header else {
        return ByteRange::Full;
    };
    if total == 0 {
        return ByteRange::Unsatisfiable;
    }
    let Some(spec) = header.strip_prefix("bytes=") else {
        return ByteRange::Full;
    };
    // Multi-range requests are not supported; serve the full body.
    if spec.contains(',') {
        return ByteRange::Full;
    }
    let Some((start_s, end_s)) = spec.trim().split_once('-') else {
        return ByteRange::Full;
    };

    match (start_s.is_empty(), end_s.is_empty()) {
        // "bytes=-N": final N bytes.
        (true, false) => match end_s.parse::<u64>() {
            Ok(0) => ByteRange::Unsatisfiable,
            Ok(n) => {
                let start = total.saturating_sub(n);
                ByteRange::Partial {
                    start,
                    end: total - 1,
                }
            }
            Err(_) => ByteRange::Full,
        },
        // "bytes=N-": from N to the end.
        (false, true) => match start_s.parse::<u64>() {
            Ok(start) if start < total => ByteRange::Partial {
                start,
                end: total - 1,
            },
            Ok(_) => ByteRange::Unsatisfiable,
            Err(_) => ByteRange::Full,
        },
        // "bytes=N-M".
        (false, false) => match (start_s.parse::<u64>(), end_s.parse::<u64>()) {
            (Ok(start), Ok(end)) if start <= end => {
                if start >= total {
                    ByteRange::Unsatisfiable
                } else {
                    ByteRange::Partial {
                        start,
                        end: end.min(total - 1),
                    }
                }
            }
            _ => ByteRange::Full,
        },
        (true, true) => ByteRange::Full,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_header_serves_full_body() {
        assert_eq!(parse_range(None, 100), ByteRange::Full);
    }

    #[test]
    fn closed_range_is_inclusive() {
        assert_eq!(
            parse_range(Some("bytes=0-99"), 1000),
            ByteRange::Partial { start: 0, end: 99 }
        );
        assert_eq!(
            parse_range(Some("bytes=500-999"), 1000),
            ByteRange::Partial {
                start: 500,
                end: 999
            }
        );
    }

    #[test]
    fn open_range_runs_to_the_end() {
        assert_eq!(
            parse_range(Some("bytes=900-"), 1000),
            ByteRange::Partial {
                start: 900,
                end: 999
            }
        );
    }

    #[test]
    fn suffix_range_takes_the_tail() {
        assert_eq!(
            parse_range(Some("bytes=-100"), 1000),
            ByteRange::Partial {
                start: 900,
                end: 999
            }
        );
        // Suffix longer than the resource clamps to the whole body.
        assert_eq!(
            parse_range(Some("bytes=-5000"), 1000),
            ByteRange::Partial { start: 0, end: 999 }
        );
    }

    #[test]
    fn end_clamps_to_resource_length() {
        assert_eq!(
            parse_range(Some("bytes=0-5000"), 1000),
            ByteRange::Partial { start: 0, end: 999 }
        );
    }

    #[test]
    fn start_past_the_end_is_unsatisfiable() {
        assert_eq!(parse_range(Some("bytes=1000-"), 1000), ByteRange::Unsatisfiable);
        assert_eq!(
            parse_range(Some("bytes=2000-3000"), 1000),
            ByteRange::Unsatisfiable
        );
    }

    #[test]
    fn malformed_headers_fall_back_to_full() {
        for header in [
            "bytes=abc-def",
            "bytes=5-2",
            "bytes=",
            "items=0-10",
            "bytes=0-10,20-30",
            "bytes=-",
        ] {
            assert_eq!(parse_range(Some(header), 1000), ByteRange::Full, "{header}");
        }
    }

    #[test]
    fn empty_resource_is_never_satisfiable() {
        assert_eq!(parse_range(Some("bytes=0-"), 0), ByteRange::Unsatisfiable);
    }
}
