//! Positional data-field keys.
//!
//! Link and Spotter fields that feed the simulation are keyed positionally:
//! `c07.Resistance` is config slot 7 named `Resistance`, `i02.Flow` is input
//! slot 2 named `Flow`. The part after the dot is the field's *tail*; schema
//! reconciliation matches instance fields to master fields by tail alone.

use std::fmt;

use winnow::{
    Parser as _,
    ascii::digit1,
    error::{ContextError, ErrMode},
    token::{one_of, take_while},
};

type PResult<O> = Result<O, ErrMode<ContextError>>;

/// Whether a positional field is a config parameter or an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldClass {
    Config,
    Input,
}

impl FieldClass {
    pub fn prefix(&self) -> char {
        match self {
            FieldClass::Config => 'c',
            FieldClass::Input => 'i',
        }
    }
}

/// A parsed positional field key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldKey {
    class: FieldClass,
    index: u32,
    name: String,
}

impl FieldKey {
    pub fn new(class: FieldClass, index: u32, name: impl Into<String>) -> Self {
        Self {
            class,
            index,
            name: name.into(),
        }
    }

    /// Parse a `c##.<name>` / `i##.<name>` key. Free-form keys yield `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use netweave_parser::field_key::{FieldClass, FieldKey};
    ///
    /// let key = FieldKey::parse("c03.Capacitance").unwrap();
    /// assert_eq!(key.class(), FieldClass::Config);
    /// assert_eq!(key.index(), 3);
    /// assert_eq!(key.name(), "Capacitance");
    /// assert!(FieldKey::parse("drawing").is_none());
    /// ```
    pub fn parse(key: &str) -> Option<Self> {
        field_key.parse(key).ok()
    }

    pub fn class(&self) -> FieldClass {
        self.class
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}.{}", self.class.prefix(), self.index, self.name)
    }
}

/// The tail of a positional key, borrowed from `key`.
///
/// ```
/// use netweave_parser::field_key::field_tail;
///
/// assert_eq!(field_tail("i12.Pressure"), Some("Pressure"));
/// assert_eq!(field_tail("Key"), None);
/// ```
pub fn field_tail(key: &str) -> Option<&str> {
    let mut input = key;
    prefix(&mut input).ok()?;
    (!input.is_empty()).then_some(input)
}

/// Returns `true` for `c##.` / `i##.` keys.
pub fn is_positional(key: &str) -> bool {
    field_tail(key).is_some()
}

fn field_class(input: &mut &str) -> PResult<FieldClass> {
    one_of(['c', 'i'])
        .map(|c| {
            if c == 'c' {
                FieldClass::Config
            } else {
                FieldClass::Input
            }
        })
        .parse_next(input)
}

fn slot(input: &mut &str) -> PResult<u32> {
    digit1.try_map(str::parse::<u32>).parse_next(input)
}

fn prefix(input: &mut &str) -> PResult<(FieldClass, u32)> {
    (field_class, slot, '.')
        .map(|(class, index, _)| (class, index))
        .parse_next(input)
}

fn field_key(input: &mut &str) -> PResult<FieldKey> {
    (prefix, take_while(1.., |_: char| true))
        .map(|((class, index), name): ((FieldClass, u32), &str)| FieldKey::new(class, index, name))
        .parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_config_and_input() {
        let config = FieldKey::parse("c00.Resistance").unwrap();
        assert_eq!(config, FieldKey::new(FieldClass::Config, 0, "Resistance"));

        let input = FieldKey::parse("i15.Flow.Rate").unwrap();
        assert_eq!(input.class(), FieldClass::Input);
        assert_eq!(input.index(), 15);
        assert_eq!(input.name(), "Flow.Rate");
    }

    #[test]
    fn test_rejects_free_form_keys() {
        assert!(FieldKey::parse("Key").is_none());
        assert!(FieldKey::parse("c.Resistance").is_none());
        assert!(FieldKey::parse("x01.Resistance").is_none());
        assert!(FieldKey::parse("c01.").is_none());
        assert!(FieldKey::parse("").is_none());
    }

    #[test]
    fn test_display_pads_index() {
        assert_eq!(
            FieldKey::new(FieldClass::Config, 3, "Gain").to_string(),
            "c03.Gain"
        );
        assert_eq!(
            FieldKey::new(FieldClass::Input, 120, "Q").to_string(),
            "i120.Q"
        );
    }

    #[test]
    fn test_field_tail() {
        assert_eq!(field_tail("c07.Area"), Some("Area"));
        assert!(is_positional("i00.Area"));
        assert!(!is_positional("drawing"));
        assert!(!is_positional("c07."));
    }

    proptest! {
        #[test]
        fn prop_tail_ignores_prefix(index in 0u32..1000, name in "[A-Za-z][A-Za-z0-9_]{0,12}", config in any::<bool>()) {
            let class = if config { FieldClass::Config } else { FieldClass::Input };
            let key = FieldKey::new(class, index, name.clone()).to_string();
            prop_assert_eq!(field_tail(&key), Some(name.as_str()));
        }
    }
}
