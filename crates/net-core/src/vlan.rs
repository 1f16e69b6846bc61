//! Compact VLAN range syntax ("12,14-18,23")
//!
//! Switches report trunk membership in this form and network VLAN
//! allocations are written the same way, so both sides share one parser.

use std::collections::BTreeSet;

use fabric_shared_types::VlanId;

use crate::error::ValidationError;
use crate::Result;

fn invalid(spec: &str, reason: impl Into<String>) -> crate::NetworkError {
    ValidationError::InvalidVlanSpec {
        spec: spec.to_string(),
        reason: reason.into(),
    }
    .into()
}

fn parse_bound(spec: &str, raw: &str) -> Result<VlanId> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(spec, format!("malformed token '{}'", raw)));
    }

    let value: u32 = raw
        .parse()
        .map_err(|_| invalid(spec, format!("malformed token '{}'", raw)))?;
    if value < u32::from(VlanId::MIN) || value > u32::from(VlanId::MAX) {
        return Err(invalid(
            spec,
            format!(
                "{} is outside {}-{}",
                value,
                VlanId::MIN,
                VlanId::MAX
            ),
        ));
    }

    VlanId::new(value as u16).map_err(|e| invalid(spec, e.to_string()))
}

/// Expand a comma separated list of VLAN ids and inclusive dash ranges.
///
/// Rejects empty or malformed tokens, reversed ranges, ids outside 1-4094
/// and any id listed more than once (including overlapping ranges).
pub fn parse_vlan_ranges(spec: &str) -> Result<BTreeSet<VlanId>> {
    if spec.trim().is_empty() {
        return Err(invalid(spec, "empty specification"));
    }

    let mut vlans = BTreeSet::new();

    for token in spec.split(',') {
        let (start, end) = match token.split_once('-') {
            Some((start, end)) => (parse_bound(spec, start)?, parse_bound(spec, end)?),
            None => {
                let single = parse_bound(spec, token)?;
                (single, single)
            }
        };

        if start > end {
            return Err(invalid(
                spec,
                format!("reversed range {}-{}", start, end),
            ));
        }

        for id in start.as_u16()..=end.as_u16() {
            // Bounds were checked above, every id in between is valid
            let vlan = VlanId::new(id).map_err(|e| invalid(spec, e.to_string()))?;
            if !vlans.insert(vlan) {
                return Err(invalid(spec, format!("VLAN {} listed more than once", vlan)));
            }
        }
    }

    Ok(vlans)
}

/// Render a set of VLANs in the compact form accepted by
/// [`parse_vlan_ranges`]. Consecutive ids collapse into `a-b`.
pub fn format_vlan_ranges(vlans: &BTreeSet<VlanId>) -> String {
    let mut parts = Vec::new();
    let mut iter = vlans.iter().map(|v| v.as_u16()).peekable();

    while let Some(start) = iter.next() {
        let mut end = start;
        while let Some(&next) = iter.peek() {
            if next != end + 1 {
                break;
            }
            end = next;
            iter.next();
        }

        if start == end {
            parts.push(start.to_string());
        } else {
            parts.push(format!("{}-{}", start, end));
        }
    }

    parts.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NetworkError;

    fn ids(vlans: &BTreeSet<VlanId>) -> Vec<u16> {
        vlans.iter().map(|v| v.as_u16()).collect()
    }

    fn assert_invalid(spec: &str) {
        match parse_vlan_ranges(spec) {
            Err(NetworkError::Validation(ValidationError::InvalidVlanSpec { .. })) => {}
            other => panic!("expected InvalidVlanSpec for '{}', got {:?}", spec, other),
        }
    }

    #[test]
    fn expands_ranges_inclusively() {
        let vlans = parse_vlan_ranges("12,14-18,23").unwrap();
        assert_eq!(ids(&vlans), vec![12, 14, 15, 16, 17, 18, 23]);

        assert_eq!(ids(&parse_vlan_ranges("20").unwrap()), vec![20]);
        assert_eq!(ids(&parse_vlan_ranges("20-22").unwrap()), vec![20, 21, 22]);
        assert_eq!(ids(&parse_vlan_ranges(" 1 , 4094 ").unwrap()), vec![1, 4094]);
    }

    #[test]
    fn rejects_bad_specs() {
        assert_invalid("5000");
        assert_invalid("0");
        assert_invalid("18-14");
        assert_invalid("");
        assert_invalid("12,,14");
        assert_invalid("12,");
        assert_invalid("a-b");
        assert_invalid("-5");
        assert_invalid("1-2-3");
        assert_invalid("99999999999");
    }

    #[test]
    fn rejects_duplicates_and_overlaps() {
        assert_invalid("12,12");
        assert_invalid("10-15,14");
        assert_invalid("10-15,15-20");
    }

    #[test]
    fn formatting_round_trips() {
        let spec = "12,14-18,23";
        let vlans = parse_vlan_ranges(spec).unwrap();
        assert_eq!(format_vlan_ranges(&vlans), spec);
        assert_eq!(parse_vlan_ranges(&format_vlan_ranges(&vlans)).unwrap(), vlans);

        let unordered = parse_vlan_ranges("30,3,4,5").unwrap();
        assert_eq!(format_vlan_ranges(&unordered), "3-5,30");
        assert_eq!(format_vlan_ranges(&BTreeSet::new()), "");
    }
}
