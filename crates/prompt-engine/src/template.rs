use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(usize),
}

/// A command line split into literal text and answer slots numbered in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
    slots: usize,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_literal(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Segment::Literal(last)) = self.segments.last_mut() {
            last.push_str(text);
        } else {
            self.segments.push(Segment::Literal(text.to_string()));
        }
    }

    /// Appends a slot and returns its index.
    pub fn push_slot(&mut self) -> usize {
        let slot = self.slots;
        self.segments.push(Segment::Slot(slot));
        self.slots += 1;
        slot
    }

    pub fn ends_with_whitespace(&self) -> bool {
        match self.segments.last() {
            Some(Segment::Literal(text)) => text.ends_with(char::is_whitespace),
            _ => false,
        }
    }

    /// Substitutes `answers[n]` into slot `n`. Missing answers leave the slot empty.
    pub fn fill(&self, answers: &[String]) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(slot) => {
                    if let Some(answer) = answers.get(*slot) {
                        out.push_str(answer);
                    }
                }
            }
        }
        out
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => f.write_str(text)?,
                Segment::Slot(slot) => write!(f, "{{{slot}}}")?,
            }
        }
        Ok(())
    }
}
