use std::fmt;

/// Human readable status lines, in the order the stages produced them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary(Vec<String>);

impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.0.push(line.into());
    }

    pub fn extend(&mut self, other: Summary) {
        self.0.extend(other.0);
    }

    pub fn lines(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, line: &str) -> bool {
        self.0.iter().any(|l| l == line)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.0 {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
