use std::cmp::Ordering;

/// Numeric value of one dotted component: its leading digits, or 0.
fn component(piece: &str) -> u64 {
    let digits: &str = piece
        .find(|c: char| !c.is_ascii_digit())
        .map_or(piece, |end| &piece[..end]);
    digits.parse().unwrap_or(0)
}

fn significant_components(version: &str) -> Vec<u64> {
    let mut parts: Vec<u64> = version.split('.').map(component).collect();
    while parts.last() == Some(&0) {
        parts.pop();
    }
    parts
}

/// Compare two dotted versions.
///
/// Trailing zero components are ignored, remaining components compare as
/// integers left to right with missing components read as 0. When every
/// compared component matches, the longer sequence wins.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let a_parts = significant_components(a);
    let b_parts = significant_components(b);
    let width = a_parts.len().max(b_parts.len());
    for i in 0..width {
        let a_piece = a_parts.get(i).copied().unwrap_or(0);
        let b_piece = b_parts.get(i).copied().unwrap_or(0);
        match a_piece.cmp(&b_piece) {
            Ordering::Equal => {}
            decided => return decided,
        }
    }
    a_parts.len().cmp(&b_parts.len())
}
