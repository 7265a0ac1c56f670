//! Interactive prompt contract.
//!
//! Every step returns [`Prompt`], so "answered with nothing" and
//! "cancelled" stay distinguishable at each call site.

use crate::error::LayoutError;

/// Outcome of an interactive step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt<T> {
    Value(T),
    Cancelled,
}

impl<T> Prompt<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn value(self) -> Option<T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Cancelled => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Prompt<U> {
        match self {
            Self::Value(v) => Prompt::Value(f(v)),
            Self::Cancelled => Prompt::Cancelled,
        }
    }
}

impl<T> From<Option<T>> for Prompt<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Value(v),
            None => Self::Cancelled,
        }
    }
}

/// Returns an error message for invalid input.
pub type Validator = fn(&str) -> Option<String>;

/// Free-text prompt parameters.
#[derive(Debug, Clone, Default)]
pub struct InputRequest<'a> {
    pub prompt: &'a str,
    pub placeholder: Option<&'a str>,
    /// Pre-filled answer (editing an existing value).
    pub initial: Option<&'a str>,
    /// Invalid answers are re-asked, never returned.
    pub validate: Option<Validator>,
}

impl<'a> InputRequest<'a> {
    pub fn new(prompt: &'a str) -> Self {
        Self {
            prompt,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    #[must_use]
    pub fn initial(mut self, initial: &'a str) -> Self {
        self.initial = Some(initial);
        self
    }

    #[must_use]
    pub fn validate(mut self, validate: Validator) -> Self {
        self.validate = Some(validate);
        self
    }

    /// Run the validator, if any.
    pub fn check(&self, answer: &str) -> Option<String> {
        self.validate.and_then(|v| v(answer))
    }
}

/// Validator for layout and terminal names.
pub fn require_name(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        Some("name must not be empty".to_string())
    } else {
        None
    }
}

/// Operator-facing prompt surface.
pub trait Prompter {
    fn input(&mut self, request: &InputRequest<'_>) -> Result<Prompt<String>, LayoutError>;

    /// Index of the chosen item. Callers go through [`Prompter::choose`],
    /// so an index outside `items` is tolerated.
    fn select(&mut self, title: &str, items: &[String]) -> Result<Prompt<usize>, LayoutError>;

    /// [`Prompter::select`], treating an index outside `items` as cancelled.
    fn choose(&mut self, title: &str, items: &[String]) -> Result<Prompt<usize>, LayoutError> {
        match self.select(title, items)? {
            Prompt::Value(idx) if idx >= items.len() => {
                tracing::warn!(title, idx, items = items.len(), "selection out of range");
                Ok(Prompt::Cancelled)
            }
            answer => Ok(answer),
        }
    }

    /// Indices of the chosen items, in the order the operator picked them.
    fn multi_select(
        &mut self,
        title: &str,
        items: &[String],
    ) -> Result<Prompt<Vec<usize>>, LayoutError>;

    fn confirm(&mut self, question: &str) -> Result<Prompt<bool>, LayoutError>;

    /// Informational message; no answer expected.
    fn notify(&mut self, message: &str);
}

impl<P: Prompter + ?Sized> Prompter for &mut P {
    fn input(&mut self, request: &InputRequest<'_>) -> Result<Prompt<String>, LayoutError> {
        (**self).input(request)
    }

    fn select(&mut self, title: &str, items: &[String]) -> Result<Prompt<usize>, LayoutError> {
        (**self).select(title, items)
    }

    fn multi_select(
        &mut self,
        title: &str,
        items: &[String],
    ) -> Result<Prompt<Vec<usize>>, LayoutError> {
        (**self).multi_select(title, items)
    }

    fn confirm(&mut self, question: &str) -> Result<Prompt<bool>, LayoutError> {
        (**self).confirm(question)
    }

    fn notify(&mut self, message: &str) {
        (**self).notify(message)
    }
}
