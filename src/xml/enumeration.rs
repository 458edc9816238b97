/// Symbolic names for integer field values.
#[derive(Debug, Clone, Copy)]
pub struct Enumeration {
    entries: &'static [(&'static str, u64)],
}

impl Enumeration {
    pub const fn new(entries: &'static [(&'static str, u64)]) -> Self {
        Self { entries }
    }

    /// Symbolic name of `value`, or its decimal form when none is defined.
    pub fn name(&self, value: u64) -> String {
        self.entries
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(n, _)| n.to_string())
            .unwrap_or_else(|| value.to_string())
    }

    /// Value of a symbolic name (case-insensitive). Numeric text is not
    /// resolved here.
    pub fn value(&self, name: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| *v)
    }
}
