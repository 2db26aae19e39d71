//! The option model shared by the global defaults and the active per-tag view.

use crate::codec::decode_length;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Names of every option that is kept in the defaults entry.
pub const OPTION_NAMES: [&str; 10] = [
    "digits",
    "punctuation",
    "mixedcase",
    "nospecial",
    "digitsonly",
    "length",
    "guesstag",
    "displayhash",
    "displaytag",
    "storepass",
];

/// How the site tag is guessed from the current URL.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuessTag {
    /// Do not guess.
    No,
    /// Registrable name only ("example").
    #[default]
    Name,
    /// Registrable domain ("example.com").
    Domain,
    /// Full host name.
    Full,
}

/// Whether the master secret is cached between sessions.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorePass {
    /// Never keep the secret.
    #[default]
    Never,
    /// Keep the secret indefinitely.
    Forever,
}

/// One boolean option that can be overridden per tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Flag {
    /// Include digits.
    Digits,
    /// Include punctuation.
    Punctuation,
    /// Mix upper and lower case.
    MixedCase,
    /// Avoid special characters.
    NoSpecial,
    /// Produce digits only.
    DigitsOnly,
}

impl Flag {
    /// Every flag, in wire order.
    pub const ALL: [Flag; 5] = [
        Flag::Digits,
        Flag::Punctuation,
        Flag::MixedCase,
        Flag::NoSpecial,
        Flag::DigitsOnly,
    ];

    /// Letter used in the packed flag string.
    pub fn letter(self) -> char {
        match self {
            Flag::Digits => 'd',
            Flag::Punctuation => 'p',
            Flag::MixedCase => 'm',
            Flag::NoSpecial => 'r',
            Flag::DigitsOnly => 'g',
        }
    }

    /// Flag for a packed letter, None if the letter is unknown.
    pub fn from_letter(letter: char) -> Option<Flag> {
        Flag::ALL.into_iter().find(|f| f.letter() == letter)
    }

    /// Option name of this flag.
    pub fn name(self) -> &'static str {
        match self {
            Flag::Digits => "digits",
            Flag::Punctuation => "punctuation",
            Flag::MixedCase => "mixedcase",
            Flag::NoSpecial => "nospecial",
            Flag::DigitsOnly => "digitsonly",
        }
    }
}

/// The options that shape the generated hash word.  This is everything a tag override carries.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashSettings {
    /// Include digits.
    pub digits: bool,
    /// Include punctuation.
    pub punctuation: bool,
    /// Mix upper and lower case.
    #[serde(rename = "mixedcase")]
    pub mixed_case: bool,
    /// Avoid special characters.
    #[serde(rename = "nospecial")]
    pub no_special: bool,
    /// Produce digits only.
    #[serde(rename = "digitsonly")]
    pub digits_only: bool,
    /// Length of the hash word.
    pub length: u32,
}

impl Default for HashSettings {
    fn default() -> Self {
        Self {
            digits: true,
            punctuation: true,
            mixed_case: true,
            no_special: false,
            digits_only: false,
            length: 8,
        }
    }
}

impl HashSettings {
    /// Value of flag.
    pub fn flag(&self, flag: Flag) -> bool {
        match flag {
            Flag::Digits => self.digits,
            Flag::Punctuation => self.punctuation,
            Flag::MixedCase => self.mixed_case,
            Flag::NoSpecial => self.no_special,
            Flag::DigitsOnly => self.digits_only,
        }
    }

    /// Set flag to value.
    pub fn set_flag(&mut self, flag: Flag, value: bool) {
        let field = match flag {
            Flag::Digits => &mut self.digits,
            Flag::Punctuation => &mut self.punctuation,
            Flag::MixedCase => &mut self.mixed_case,
            Flag::NoSpecial => &mut self.no_special,
            Flag::DigitsOnly => &mut self.digits_only,
        };
        *field = value;
    }

    /// Names of the options where self differs from base, in wire order.
    /// This is the only place that decides whether a tag override is worth keeping.
    pub fn changed_fields(&self, base: &HashSettings) -> Vec<&'static str> {
        let mut changed: Vec<&'static str> = Flag::ALL
            .into_iter()
            .filter(|f| self.flag(*f) != base.flag(*f))
            .map(Flag::name)
            .collect();
        if self.length != base.length {
            changed.push("length");
        }
        changed
    }

    /// True if any field differs from base.
    pub fn differs_from(&self, base: &HashSettings) -> bool {
        !self.changed_fields(base).is_empty()
    }
}

/// Full option set, used both for the global defaults and the active context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    /// Options that can be overridden per tag.
    #[serde(flatten)]
    pub hash: HashSettings,
    /// Tag guessing mode.
    #[serde(rename = "guesstag")]
    pub guess_tag: GuessTag,
    /// Show the generated hash in clear text.
    #[serde(rename = "displayhash")]
    pub display_hash: bool,
    /// Show the tag in clear text.
    #[serde(rename = "displaytag")]
    pub display_tag: bool,
    /// Secret retention policy.
    #[serde(rename = "storepass")]
    pub store_pass: StorePass,
}

/// Result of overlaying a stored defaults entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Overlay {
    /// The stored entry used an old or invalid representation and should be written back.
    pub rewrite: bool,
    /// Stored keys that are no longer options.
    pub dropped: Vec<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            hash: HashSettings::default(),
            guess_tag: GuessTag::Name,
            display_hash: false,
            display_tag: true,
            store_pass: StorePass::Never,
        }
    }
}

impl Options {
    /// Built in defaults, used for any option missing from storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build options from a stored defaults entry, starting from the built in template.
    pub fn from_stored(stored: &Map<String, Value>) -> (Self, Overlay) {
        let mut options = Self::new();
        let overlay = options.overlay(stored);
        (options, overlay)
    }

    /// Copy every recognised option in stored over self.
    /// Unknown keys are dropped, values that can not be read keep the current value.
    pub fn overlay(&mut self, stored: &Map<String, Value>) -> Overlay {
        let mut result = Overlay::default();
        for (name, value) in stored {
            let ok = match name.as_str() {
                "digits" => set_field(&mut self.hash.digits, value),
                "punctuation" => set_field(&mut self.hash.punctuation, value),
                "mixedcase" => set_field(&mut self.hash.mixed_case, value),
                "nospecial" => set_field(&mut self.hash.no_special, value),
                "digitsonly" => set_field(&mut self.hash.digits_only, value),
                "length" => match decode_length(value) {
                    Ok((length, legacy)) => {
                        self.hash.length = length;
                        result.rewrite |= legacy;
                        true
                    }
                    Err(err) => {
                        warn!(%err, "ignoring stored length");
                        false
                    }
                },
                "guesstag" => set_field(&mut self.guess_tag, value),
                "displayhash" => set_field(&mut self.display_hash, value),
                "displaytag" => set_field(&mut self.display_tag, value),
                "storepass" => set_field(&mut self.store_pass, value),
                _ => {
                    debug!(option = %name, "dropping obsolete option");
                    result.dropped.push(name.clone());
                    true
                }
            };
            if !ok {
                result.rewrite = true;
            }
        }
        result
    }

    /// Serialize to the defaults entry.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Decode value into field, returns false (and leaves field alone) if it has the wrong shape.
fn set_field<T: DeserializeOwned>(field: &mut T, value: &Value) -> bool {
    match T::deserialize(value) {
        Ok(v) => {
            *field = v;
            true
        }
        Err(err) => {
            warn!(%err, %value, "ignoring stored option");
            false
        }
    }
}
