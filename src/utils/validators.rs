// Validateurs purs (sans accès BD) utilisés par les DTO et les services.
//
// - hex_color : normalise un code couleur en #RRGGBB
// - OneOfTwoValidator : refuse un mélange cyrillique / latin
// - MinLenValidator : longueur minimale (en caractères)

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use validator::ValidationError;

/// Longueur minimale d'un username
pub const MIN_USERNAME_LENGTH: usize = 3;

static ONLY_CYRILLIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^а-яёА-ЯЁ]+").expect("static regex"));
static ONLY_LATIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-zA-Z]+").expect("static regex"));

/// Normalise un code couleur hexadécimal.
///
/// Accepte 3 ou 6 chiffres hexa, avec ou sans `#` et espaces autour.
/// `"#0af"` → `"#00AAFF"`, `"00aaff"` → `"#00AAFF"`.
pub fn hex_color(color: &str) -> Result<String, String> {
    let color = color.trim_matches(|c| c == ' ' || c == '#');

    let len = color.chars().count();
    if len != 3 && len != 6 {
        return Err(format!("Color code {color} has invalid length ({len})."));
    }
    if !color.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("{color} is not hexadecimal."));
    }

    let expanded: String = if len == 3 {
        color.chars().flat_map(|c| [c, c]).collect()
    } else {
        color.to_string()
    };

    Ok(format!("#{}", expanded.to_uppercase()))
}

/// Vérifie une valeur contre deux regex : au plus une des deux peut matcher.
///
/// Par défaut la première matche tout ce qui n'est pas cyrillique et la
/// seconde tout ce qui n'est pas latin, donc une valeur passe seulement si
/// elle est écrite entièrement dans un des deux alphabets.
#[derive(Debug, Clone)]
pub struct OneOfTwoValidator {
    first: Regex,
    second: Regex,
    field: &'static str,
}

impl Default for OneOfTwoValidator {
    fn default() -> Self {
        Self {
            first: ONLY_CYRILLIC.clone(),
            second: ONLY_LATIN.clone(),
            field: "Value",
        }
    }
}

impl OneOfTwoValidator {
    pub fn new(first: &str, second: &str, field: &'static str) -> Result<Self, regex::Error> {
        Ok(Self {
            first: Regex::new(first)?,
            second: Regex::new(second)?,
            field,
        })
    }

    pub fn for_field(field: &'static str) -> Self {
        Self {
            field,
            ..Self::default()
        }
    }

    pub fn check(&self, value: &str) -> Result<(), String> {
        if self.first.is_match(value) && self.second.is_match(value) {
            return Err(format!(
                "{} <{value}> mixes alphabets or contains non-letters.",
                self.field
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MinLenValidator {
    pub min_len: usize,
    pub field: &'static str,
}

impl MinLenValidator {
    pub fn new(min_len: usize, field: &'static str) -> Self {
        Self { min_len, field }
    }

    pub fn check(&self, value: &str) -> Result<(), String> {
        if value.chars().count() < self.min_len {
            return Err(format!(
                "{} is too short (min {} characters).",
                self.field, self.min_len
            ));
        }
        Ok(())
    }
}

fn to_validation_error(code: &'static str, message: String) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Owned(message));
    error
}

/// Utilisé par `#[validate(custom(...))]` sur le champ username
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    MinLenValidator::new(MIN_USERNAME_LENGTH, "Username")
        .check(username)
        .map_err(|m| to_validation_error("min_length", m))?;

    OneOfTwoValidator::for_field("Username")
        .check(username)
        .map_err(|m| to_validation_error("one_alphabet", m))
}

/// Prénom / nom : une seule écriture
pub fn validate_person_name(name: &str) -> Result<(), ValidationError> {
    OneOfTwoValidator::for_field("Name")
        .check(name)
        .map_err(|m| to_validation_error("one_alphabet", m))
}
