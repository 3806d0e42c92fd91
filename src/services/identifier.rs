//! Universal Location identifier parsing
//!
//! A location path is a `/`-separated list of `Keyword(value)` segments:
//!
//! ```text
//! GlobalConsensus(3)/Parachain(3336)/PalletInstance(51)/AccountKey20(0xABC)/GeneralKey(789)
//! ```
//!
//! Fields are looked up in fixed order. Each lookup scans the remaining
//! segments for the first `Keyword(...)` occurrence; once found, the leading
//! remaining segment is consumed before the next field is searched. A field
//! that only appears before the cursor is therefore reported missing.

/// Field keywords in the order they must appear
pub const FIELD_ORDER: [&str; 5] = [
    "GlobalConsensus",
    "Parachain",
    "PalletInstance",
    "AccountKey20",
    "GeneralKey",
];

/// A fully parsed location; every field is present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationIdentifier {
    /// `GlobalConsensus` value
    pub network: String,
    /// `Parachain` value
    pub sub_network: String,
    /// `PalletInstance` value
    pub registry_instance: String,
    /// `AccountKey20` value (contract address)
    pub holder_address: String,
    /// `GeneralKey` value (token id)
    pub asset_id: String,
}

/// Parse failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The named field is absent or appears after a field that follows it
    #[error("Missing or out-of-order field: {0}")]
    MissingOrOutOfOrder(&'static str),
}

impl ParseError {
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingOrOutOfOrder(field) => field,
        }
    }
}

/// Read-only view over the segments that have not been consumed yet
#[derive(Debug, Clone, Copy)]
struct Cursor<'a> {
    segments: &'a [&'a str],
}

impl<'a> Cursor<'a> {
    /// Find `keyword` in the remaining segments and return its value along
    /// with the cursor advanced past the leading segment
    fn take(self, keyword: &str) -> Option<(&'a str, Cursor<'a>)> {
        let value = self
            .segments
            .iter()
            .find_map(|segment| extract_value(keyword, segment))?;
        let rest = self.segments.get(1..).unwrap_or_default();
        Some((value, Cursor { segments: rest }))
    }
}

/// Parse a location path into its five fields
pub fn parse(path: &str) -> Result<LocationIdentifier, ParseError> {
    let segments: Vec<&str> = path.split('/').collect();
    let mut cursor = Cursor { segments: &segments };
    let mut values: [&str; 5] = [""; 5];

    for (slot, keyword) in values.iter_mut().zip(FIELD_ORDER) {
        let (value, next) = cursor
            .take(keyword)
            .ok_or(ParseError::MissingOrOutOfOrder(keyword))?;
        *slot = value;
        cursor = next;
    }

    let [network, sub_network, registry_instance, holder_address, asset_id] = values;
    Ok(LocationIdentifier {
        network: network.to_string(),
        sub_network: sub_network.to_string(),
        registry_instance: registry_instance.to_string(),
        holder_address: holder_address.to_string(),
        asset_id: asset_id.to_string(),
    })
}

/// Extract the text between `keyword(` and the next `)` within a segment
///
/// The keyword may sit anywhere in the segment. When an occurrence has no
/// closing bracket, later occurrences are still considered.
fn extract_value<'a>(keyword: &str, segment: &'a str) -> Option<&'a str> {
    segment.match_indices(keyword).find_map(|(start, _)| {
        let after = &segment[start + keyword.len()..];
        let inner = after.strip_prefix('(')?;
        inner.find(')').map(|end| &inner[..end])
    })
}
