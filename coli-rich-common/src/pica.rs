//! PICA patch builder
//!
//! Renders selected concept mappings for one catalog record into the PICA
//! patch text that clients submit as an enrichment:
//!
//! ```text
//!   003@ $0389598534
//! + 045Q/01 $a54.72$Acoli-conc$Ahttps://coli-conc.gbv.de/api/mappings/1
//! ```
//!
//! The service stores these payloads verbatim; nothing server-side parses them.

/// Source tag written after each notation
pub const SOURCE_TAG: &str = "coli-conc";

/// Check a PPN: digits with an optional trailing check character `X`
///
/// # Examples
///
/// ```
/// use coli_rich_common::pica::is_valid_ppn;
///
/// assert!(is_valid_ppn("389598534"));
/// assert!(is_valid_ppn("16465294X"));
/// assert!(!is_valid_ppn("abc"));
/// ```
pub fn is_valid_ppn(ppn: &str) -> bool {
    let digits = ppn
        .strip_suffix('X')
        .or_else(|| ppn.strip_suffix('x'))
        .unwrap_or(ppn);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// One subject to add: target notation in a scheme plus the mappings backing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    /// PICA field of the target scheme, e.g. `045Q/01`
    pub field: String,
    /// Notation of the target concept
    pub notation: String,
    /// URIs of the mappings that led to this suggestion
    pub mapping_uris: Vec<String>,
}

/// Patch adding subjects to one catalog record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PicaPatch {
    ppn: String,
    suggestions: Vec<Suggestion>,
}

impl PicaPatch {
    pub fn new(ppn: impl Into<String>) -> Self {
        Self {
            ppn: ppn.into(),
            suggestions: Vec::new(),
        }
    }

    pub fn ppn(&self) -> &str {
        &self.ppn
    }

    pub fn push(&mut self, suggestion: Suggestion) -> &mut Self {
        self.suggestions.push(suggestion);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.suggestions.is_empty()
    }

    /// Render the patch text
    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(self.suggestions.len());
        for suggestion in &self.suggestions {
            let mut line = format!(
                "+ {} $a{}$A{}",
                suggestion.field, suggestion.notation, SOURCE_TAG
            );
            for uri in &suggestion.mapping_uris {
                line.push_str("$A");
                line.push_str(uri);
            }
            lines.push(line);
        }
        format!("  003@ $0{}\n{}", self.ppn, lines.join("\n"))
    }
}
