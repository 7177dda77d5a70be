//! Privacy projection of person contact fields.
//!
//! # Responsibility
//! - Mask phone numbers and email addresses deterministically.
//! - Resolve photo references to public URLs.
//!
//! # Invariants
//! - Every function here is pure: no I/O, no request context, no logging.
//! - Lengths are counted in characters, not bytes.
//! - Filesystem paths never appear in a resolved photo URL.

use crate::config::PhotoConfig;
use crate::model::person::{Person, PrivacyProjection, PublicPerson};

const PHONE_VISIBLE_EDGE: usize = 4;
const PHONE_MIN_MASKABLE: usize = 8;
const EMAIL_VISIBLE_PREFIX: usize = 2;
const MASK_CHAR: char = '*';

/// Masks the middle of a phone number, keeping 4 characters on each side.
///
/// Numbers of 8 characters or fewer are returned unchanged.
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() <= PHONE_MIN_MASKABLE {
        return phone.to_string();
    }

    let tail_start = chars.len() - PHONE_VISIBLE_EDGE;
    chars
        .iter()
        .enumerate()
        .map(|(index, ch)| {
            if index < PHONE_VISIBLE_EDGE || index >= tail_start {
                *ch
            } else {
                MASK_CHAR
            }
        })
        .collect()
}

/// Masks the local part of an email after its first 2 characters.
///
/// Local parts of 2 characters or fewer, and inputs without `@`, are
/// returned unchanged.
pub fn mask_email(email: &str) -> String {
    let Some((local, domain)) = email.split_once('@') else {
        return email.to_string();
    };
    let local_len = local.chars().count();
    if local_len <= EMAIL_VISIBLE_PREFIX {
        return email.to_string();
    }

    let mut masked: String = local.chars().take(EMAIL_VISIBLE_PREFIX).collect();
    masked.extend(std::iter::repeat(MASK_CHAR).take(local_len - EMAIL_VISIBLE_PREFIX));
    masked.push('@');
    masked.push_str(domain);
    masked
}

/// Resolves a stored photo reference to a public URL.
///
/// Only the final path segment is kept; missing or blank references fall back
/// to the default avatar.
pub fn resolve_photo_url(photo_path: Option<&str>, photos: &PhotoConfig) -> String {
    let file_name = photo_path
        .map(str::trim)
        .and_then(|path| path.rsplit(['/', '\\']).next())
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "." && *name != "..");

    match file_name {
        Some(name) => format!("{}/{}", photos.base_url.trim_end_matches('/'), name),
        None => photos.default_avatar_url.clone(),
    }
}

/// Builds public-safe projections of person records.
#[derive(Debug, Clone, Default)]
pub struct PrivacyProjector {
    photos: PhotoConfig,
}

impl PrivacyProjector {
    pub fn new(photos: PhotoConfig) -> Self {
        Self { photos }
    }

    /// Projects the contact fields of one person.
    pub fn project(&self, person: &Person) -> PrivacyProjection {
        PrivacyProjection {
            photo_url: resolve_photo_url(person.photo_path.as_deref(), &self.photos),
            masked_phone: non_blank(person.phone.as_deref()).map(mask_phone),
            masked_email: non_blank(person.email.as_deref()).map(mask_email),
        }
    }

    /// Projects a person into the public view attached to results.
    pub fn public_person(&self, person: &Person) -> PublicPerson {
        PublicPerson {
            id: person.id,
            full_name: person.full_name.clone(),
            status: person.status,
            contact: self.project(person),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{mask_email, mask_phone, resolve_photo_url, PrivacyProjector};
    use crate::config::PhotoConfig;
    use crate::model::person::Person;

    #[test]
    fn mask_phone_keeps_four_characters_on_each_side() {
        assert_eq!(mask_phone("081234567890"), "0812****7890");
        assert_eq!(mask_phone("+62812345678"), "+628****5678");
    }

    #[test]
    fn mask_phone_leaves_short_numbers_unchanged() {
        assert_eq!(mask_phone("1234567"), "1234567");
        assert_eq!(mask_phone("12345678"), "12345678");
        assert_eq!(mask_phone(""), "");
        assert_eq!(mask_phone("123456789"), "1234*6789");
    }

    #[test]
    fn mask_email_keeps_two_local_characters_and_domain() {
        assert_eq!(mask_email("john.doe@example.com"), "jo******@example.com");
        assert_eq!(mask_email("abc@example.com"), "ab*@example.com");
    }

    #[test]
    fn mask_email_leaves_short_local_parts_unchanged() {
        assert_eq!(mask_email("ab@example.com"), "ab@example.com");
        assert_eq!(mask_email("a@example.com"), "a@example.com");
        assert_eq!(mask_email("not-an-email"), "not-an-email");
    }

    #[test]
    fn masking_counts_characters_not_bytes() {
        assert_eq!(mask_email("józefina@example.pl"), "jó******@example.pl");
        assert_eq!(mask_phone("０８１２３４５６７８９０"), "０８１２****７８９０");
    }

    #[test]
    fn photo_url_strips_directories() {
        let photos = PhotoConfig::default();
        assert_eq!(
            resolve_photo_url(Some("/var/uploads/members/abc.jpg"), &photos),
            "/media/members/abc.jpg"
        );
        assert_eq!(
            resolve_photo_url(Some("C:\\uploads\\abc.jpg"), &photos),
            "/media/members/abc.jpg"
        );
    }

    #[test]
    fn photo_url_falls_back_to_default_avatar() {
        let photos = PhotoConfig::default();
        assert_eq!(resolve_photo_url(None, &photos), photos.default_avatar_url);
        assert_eq!(resolve_photo_url(Some("  "), &photos), photos.default_avatar_url);
        assert_eq!(
            resolve_photo_url(Some("uploads/"), &photos),
            photos.default_avatar_url
        );
    }

    #[test]
    fn project_masks_present_fields_only() {
        let projector = PrivacyProjector::default();
        let mut person = Person::new("Jane Roe");
        person.phone = Some("081234567890".to_string());
        person.email = None;

        let projection = projector.project(&person);
        assert_eq!(projection.masked_phone.as_deref(), Some("0812****7890"));
        assert_eq!(projection.masked_email, None);
        assert_eq!(projection.photo_url, PhotoConfig::default().default_avatar_url);
        assert_eq!(projector.project(&person), projection);
    }
}
