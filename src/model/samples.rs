//! Sample name banks.

/// Names stored in one sample bank.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SampleBank {
    pub id: u8,
    pub names: Vec<String>,
}

impl SampleBank {
    /// Decode a payload of fixed-width name slots.
    ///
    /// Trailing NUL and space padding is trimmed from each name. A partial
    /// slot at the end of the payload is ignored.
    pub fn decode(id: u8, payload: &[u8], width: usize) -> Self {
        let names = payload
            .chunks_exact(width.max(1))
            .map(|slot| {
                String::from_utf8_lossy(slot)
                    .trim_end_matches(|c: char| c == '\0' || c == ' ')
                    .to_string()
            })
            .collect();
        Self { id, names }
    }

    /// Name at `index`, if present.
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
