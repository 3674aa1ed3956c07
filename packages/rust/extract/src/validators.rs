//! Per-field validators and the shared date/label patterns.
//!
//! A validator returns `Err(value)` with the refused text so the trail can
//! show what was turned down.

use std::sync::LazyLock;

use certscrape_shared::NO_EXPIRATION;
use regex::Regex;
use url::Url;

/// Names shorter than this are noise (icons, bullets, initials).
pub const MIN_NAME_CHARS: usize = 3;

const MAX_NAME_CHARS: usize = 200;
const MAX_ISSUER_CHARS: usize = 150;
const MAX_DATE_CHARS: usize = 40;
const CREDENTIAL_ID_CHARS: std::ops::RangeInclusive<usize> = 3..=128;

/// English and Indonesian month names and abbreviations.
const MONTH: &str = r"(?:jan(?:uary|uari)?|feb(?:ruary|ruari)?|mar(?:ch|et)?|apr(?:il)?|may|mei|jun(?:e|i)?|jul(?:y|i)?|aug(?:ust)?|agu(?:stus)?|agt|sep(?:t(?:ember)?)?|oct(?:ober)?|okt(?:ober)?|nov(?:ember)?|dec(?:ember)?|des(?:ember)?)";

/// One date token, as a non-capturing group.
pub fn date_token() -> String {
    format!(
        r"(?:{MONTH}\.?\s+(?:\d{{1,2}},?\s+)?\d{{4}}|\d{{1,2}}[/.-]\d{{1,2}}[/.-]\d{{2,4}}|\d{{1,2}}[/.-]\d{{4}}|\d{{4}}-\d{{2}}(?:-\d{{2}})?|\d{{4}})"
    )
}

static MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b{MONTH}\.?\s+(?:\d{{1,2}},?\s+)?\d{{4}}\b")).expect("valid regex")
});

static NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,2}[/.-]\d{1,2}[/.-]\d{2,4}$|^\d{1,2}[/.-]\d{4}$|^\d{4}(?:-\d{2}){0,2}$")
        .expect("valid regex")
});

/// Explicit "never expires" phrasing.
pub static NO_EXPIRATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bno\s+expiration(?:\s+date)?\b|\bdoes\s+not\s+expire\b|\btidak\s+ada\s+tanggal\s+(?:kedaluwarsa|kadaluarsa)\b",
    )
    .expect("valid regex")
});

/// UI chrome that is never a name or an issuer.
static BOILERPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)^(?:
            show\s+credential | see\s+credential | lihat\s+kredensial | tampilkan\s+kredensial
          | show\s+all.* | see\s+all.* | tampilkan\s+semua.* | lihat\s+semua.*
          | credential\s*id.* | id\s*kredensial.*
          | skills?\s*:.* | keahlian\s*:.*
          | licen[cs]es?\s*(?:&|and)?\s*certifications? | certifications? | lisensi(?:\s*(?:&|dan)?\s*sertifika(?:t|si))? | sertifika(?:t|si)
          | issued.* | diterbitkan.* | expires.* | expired.* | kedaluwarsa.* | kadaluarsa.*
          | no\s+expiration.*
          | (?:…|\.\.\.)?\s*see\s+more | verify | view | follow | connect | message
        )$",
    )
    .expect("valid regex")
});

/// Whether `s` is (or is dominated by) a calendar date.
pub fn looks_like_date(s: &str) -> bool {
    let s = s.trim();
    MONTH_YEAR.is_match(s) || NUMERIC_DATE.is_match(s)
}

fn is_boilerplate(s: &str) -> bool {
    BOILERPLATE.is_match(s.trim())
}

fn looks_like_url(s: &str) -> bool {
    let lower = s.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("www.")
}

fn refuse(value: &str) -> Result<(), String> {
    Err(value.to_string())
}

// ---------------------------------------------------------------------------
// Validators
// ---------------------------------------------------------------------------

pub fn name(value: &str) -> Result<(), String> {
    let len = value.trim().chars().count();
    if !(MIN_NAME_CHARS..=MAX_NAME_CHARS).contains(&len)
        || looks_like_date(value)
        || is_boilerplate(value)
        || looks_like_url(value)
    {
        return refuse(value);
    }
    Ok(())
}

/// Issuer validator. `name` is the already-resolved record name, if any.
pub fn issuer(value: &str, name: Option<&str>) -> Result<(), String> {
    let len = value.trim().chars().count();
    if !(2..=MAX_ISSUER_CHARS).contains(&len)
        || looks_like_date(value)
        || is_boilerplate(value)
        || looks_like_url(value)
    {
        return refuse(value);
    }
    if name.is_some_and(|n| n.trim().eq_ignore_ascii_case(value.trim())) {
        return refuse(value);
    }
    Ok(())
}

pub fn issue_date(value: &str) -> Result<(), String> {
    if value.chars().count() <= MAX_DATE_CHARS && looks_like_date(value) {
        Ok(())
    } else {
        refuse(value)
    }
}

/// Accepts a date or the explicit no-expiration sentinel.
pub fn expiry_date(value: &str) -> Result<(), String> {
    if value == NO_EXPIRATION {
        return Ok(());
    }
    issue_date(value)
}

pub fn credential_id(value: &str) -> Result<(), String> {
    let len = value.chars().count();
    if !CREDENTIAL_ID_CHARS.contains(&len)
        || value.chars().any(char::is_whitespace)
        || !value.chars().any(|c| c.is_ascii_alphanumeric())
        || looks_like_date(value)
        || looks_like_url(value)
    {
        return refuse(value);
    }
    Ok(())
}

/// Only absolute http(s) links with a host are accepted.
pub fn verify_link(value: &str) -> Result<(), String> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => Ok(()),
        _ => refuse(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_shapes() {
        for s in ["Jan 2024", "January 2024", "Agu 2023", "Mei 2021", "Mar 5, 2022", "2023-04", "04/2023", "12/31/2023", "2021"] {
            assert!(looks_like_date(s), "{s}");
        }
        for s in ["Amazon Web Services", "Class 2", "ISO 27001 Lead Auditor"] {
            assert!(!looks_like_date(s), "{s}");
        }
        assert!(looks_like_date("Issued Jan 2024"));
    }

    #[test]
    fn issuer_rejects_date_shaped_decoy() {
        assert!(issuer("Issued Jan 2024", None).is_err());
        assert!(issuer("Jan 2024", None).is_err());
        assert!(issuer("Credential ID 123", None).is_err());
        assert!(issuer("Show credential", None).is_err());
        assert!(issuer("Coursera", Some("Coursera")).is_err());
        assert!(issuer("Amazon Web Services (AWS)", Some("AWS Certified")).is_ok());
    }

    #[test]
    fn name_rules() {
        assert!(name("AWS Certified Cloud Practitioner").is_ok());
        assert!(name("CKA").is_ok());
        assert!(name("AB").is_err());
        assert!(name("Licenses & certifications").is_err());
        assert!(name("Show all 12 licenses").is_err());
        assert!(name("Feb 2023").is_err());
    }

    #[test]
    fn expiry_accepts_sentinel() {
        assert!(expiry_date(NO_EXPIRATION).is_ok());
        assert!(expiry_date("Jan 2027").is_ok());
        assert!(expiry_date("Never").is_err());
        assert!(NO_EXPIRATION_RE.is_match("Issued Jan 2024 · No Expiration Date"));
        assert!(NO_EXPIRATION_RE.is_match("Tidak ada tanggal kedaluwarsa"));
    }

    #[test]
    fn credential_id_rules() {
        assert!(credential_id("ABC-123_x.9").is_ok());
        assert!(credential_id("ab").is_err());
        assert!(credential_id("has space").is_err());
        assert!(credential_id("---").is_err());
    }

    #[test]
    fn links_must_be_absolute_http() {
        assert!(verify_link("https://www.credly.com/badges/abc").is_ok());
        assert!(verify_link("/redir/redirect?url=x").is_err());
        assert!(verify_link("javascript:void(0)").is_err());
        assert!(verify_link("mailto:a@b.c").is_err());
    }
}
