//! Random values for each strategy, backed by the `fake` crate.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use fake::Fake;
use fake::faker::company::raw::CompanyName;
use fake::faker::internet::raw::FreeEmailProvider;
use fake::faker::lorem::raw::{Paragraph, Sentence};
use fake::faker::name::raw::{FirstName, LastName, Name};
use fake::locales::{EN, PT_BR};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use seedsmith_core::SqlValue;

use crate::classify::Strategy;

const REAL_TEXT_MAX_CHARS: usize = 200;

/// Source of plausible values for generated rows.
pub trait ValueSource: Send {
    /// Uniform integer in `[min, max]`.
    fn number_between(&mut self, min: i64, max: i64) -> i64;
    fn boolean(&mut self) -> bool;
    fn name(&mut self) -> String;
    fn real_text(&mut self) -> String;
    fn company(&mut self) -> String;
    fn email(&mut self) -> String;
    fn cpf(&mut self) -> String;
    fn cnpj(&mut self) -> String;
    fn text(&mut self) -> String;
    fn date(&mut self) -> NaiveDate;
    fn date_time(&mut self) -> NaiveDateTime;
    fn year(&mut self) -> i64;
    fn time(&mut self) -> NaiveTime;

    /// Produce one value for `strategy`.
    fn value_for(&mut self, strategy: &Strategy) -> SqlValue {
        match strategy {
            Strategy::Name => SqlValue::Text(self.name()),
            Strategy::RealText => SqlValue::Text(self.real_text()),
            Strategy::Company => SqlValue::Text(self.company()),
            Strategy::Cnpj => SqlValue::Text(self.cnpj()),
            Strategy::Cpf => SqlValue::Text(self.cpf()),
            Strategy::Email => SqlValue::Text(self.email()),
            Strategy::Boolean => SqlValue::Bool(self.boolean()),
            Strategy::NumberBetween { max } => {
                let max = i64::try_from(*max).unwrap_or(i64::MAX).max(1);
                SqlValue::Int(self.number_between(1, max))
            }
            Strategy::Date => SqlValue::Date(self.date()),
            Strategy::DateTime => SqlValue::DateTime(self.date_time()),
            Strategy::Year => SqlValue::Int(self.year()),
            Strategy::Time => SqlValue::Time(self.time()),
            Strategy::Text => SqlValue::Text(self.text()),
        }
    }
}

/// Locales the fake data can be drawn from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en_US")]
    EnUs,
    #[serde(rename = "pt_BR")]
    PtBr,
}

impl Locale {
    /// Accepts `en_US`, `en-US`, `pt_BR`, `pt-BR` (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().replace('-', "_").to_ascii_lowercase().as_str() {
            "en" | "en_us" => Some(Locale::EnUs),
            "pt" | "pt_br" => Some(Locale::PtBr),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::EnUs => "en_US",
            Locale::PtBr => "pt_BR",
        }
    }
}

macro_rules! localized {
    ($self:ident, $faker:ident $(, $arg:expr)*) => {
        match $self.locale {
            Locale::EnUs => $faker(EN $(, $arg)*).fake_with_rng(&mut $self.rng),
            Locale::PtBr => $faker(PT_BR $(, $arg)*).fake_with_rng(&mut $self.rng),
        }
    };
}

/// [`ValueSource`] over `fake` fakers and a ChaCha8 generator.
pub struct FakerValueSource {
    rng: ChaCha8Rng,
    locale: Locale,
}

impl FakerValueSource {
    /// A source seeded with `seed` repeats its values run after run.
    pub fn new(locale: Locale, seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(rand::random);
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            locale,
        }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }
}

impl ValueSource for FakerValueSource {
    fn number_between(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        self.rng.random_range(min..=max)
    }

    fn boolean(&mut self) -> bool {
        self.rng.random_bool(0.5)
    }

    fn name(&mut self) -> String {
        localized!(self, Name)
    }

    fn real_text(&mut self) -> String {
        let paragraph: String = localized!(self, Paragraph, 1..3);
        truncate_chars(&paragraph, REAL_TEXT_MAX_CHARS)
    }

    fn company(&mut self) -> String {
        localized!(self, CompanyName)
    }

    /// `lastname.firstname@provider`, lowercased.
    fn email(&mut self) -> String {
        let last: String = localized!(self, LastName);
        let first: String = localized!(self, FirstName);
        let provider: String = localized!(self, FreeEmailProvider);
        let user = format!("{}.{}", email_slug(&last), email_slug(&first));
        format!("{user}@{provider}")
    }

    fn cpf(&mut self) -> String {
        let mut digits = [0_u8; 11];
        for digit in digits.iter_mut().take(9) {
            *digit = self.rng.random_range(0..=9);
        }
        digits[9] = cpf_check_digit(&digits[..9]);
        digits[10] = cpf_check_digit(&digits[..10]);
        digits.iter().map(|d| char::from(b'0' + *d)).collect()
    }

    fn cnpj(&mut self) -> String {
        let mut digits = [0_u8; 14];
        for digit in digits.iter_mut().take(12) {
            *digit = self.rng.random_range(0..=9);
        }
        digits[12] = cnpj_check_digit(&digits[..12]);
        digits[13] = cnpj_check_digit(&digits[..13]);
        digits.iter().map(|d| char::from(b'0' + *d)).collect()
    }

    fn text(&mut self) -> String {
        localized!(self, Sentence, 3..8)
    }

    fn date(&mut self) -> NaiveDate {
        self.date_time().date()
    }

    fn date_time(&mut self) -> NaiveDateTime {
        let now = Utc::now().timestamp();
        let secs = self.rng.random_range(0..=now.max(0));
        DateTime::from_timestamp(secs, 0)
            .map(|at| at.naive_utc())
            .unwrap_or_default()
    }

    fn year(&mut self) -> i64 {
        let current = i64::from(Utc::now().year());
        self.rng.random_range(1970..=current)
    }

    fn time(&mut self) -> NaiveTime {
        let secs = self.rng.random_range(0..86_400_u32);
        NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap_or_default()
    }
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect::<String>().trim_end().to_string()
}

fn email_slug(value: &str) -> String {
    let slug: String = value
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .map(|ch| ch.to_ascii_lowercase())
        .collect();
    if slug.is_empty() {
        "user".to_string()
    } else {
        slug
    }
}

fn cpf_check_digit(digits: &[u8]) -> u8 {
    let mut sum = 0_u32;
    let mut weight = digits.len() as u32 + 1;
    for digit in digits {
        sum += (*digit as u32) * weight;
        weight = weight.saturating_sub(1);
    }
    let remainder = sum % 11;
    if remainder < 2 { 0 } else { (11 - remainder) as u8 }
}

fn cnpj_check_digit(digits: &[u8]) -> u8 {
    let weights = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
    let offset = weights.len().saturating_sub(digits.len());
    let mut sum = 0_u32;
    for (idx, digit) in digits.iter().enumerate() {
        sum += (*digit as u32) * weights[idx + offset];
    }
    let remainder = sum % 11;
    if remainder < 2 { 0 } else { (11 - remainder) as u8 }
}
