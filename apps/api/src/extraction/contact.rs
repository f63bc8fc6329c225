//! Best-effort scan for e-mail addresses and phone numbers in resume text.
//! Results are diagnostic only: they are logged, never stored or returned.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContactInfo {
    pub emails: Vec<String>,
    pub phones: Vec<String>,
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
            .expect("email pattern compiles")
    })
}

fn phone_pattern() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    // optional +country code, optional (area code), then 3-3-4 digits
    PHONE.get_or_init(|| {
        Regex::new(r"(?:\+\d{1,3}\s?)?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}")
            .expect("phone pattern compiles")
    })
}

pub fn extract_contact_info(text: &str) -> ContactInfo {
    ContactInfo {
        emails: email_pattern()
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect(),
        phones: phone_pattern()
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect(),
    }
}
