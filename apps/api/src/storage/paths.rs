//! Object key layout.
//!
//! Every key starts with the owning user id. Fresh uploads land in
//! `{user}/temp/` and are promoted to a permanent folder once the record that
//! references them is saved.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TEMP_SEGMENT: &str = "temp";
const MAX_FILE_NAME_LEN: usize = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Folder {
    Certificates,
    ProfileImages,
}

impl Folder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Folder::Certificates => "certificates",
            Folder::ProfileImages => "profile-images",
        }
    }
}

/// Reduces a client-supplied file name to `[A-Za-z0-9._-]`, keeping the extension.
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(&['/', '\\'][..]).next().unwrap_or(raw);
    let mut cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", ".");
    }
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == '_').to_string();
    let cleaned = if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    };

    if cleaned.len() <= MAX_FILE_NAME_LEN {
        return cleaned;
    }
    match cleaned.rfind('.') {
        Some(dot) if cleaned.len() - dot <= 10 => {
            let ext = &cleaned[dot..];
            format!("{}{}", &cleaned[..MAX_FILE_NAME_LEN - ext.len()], ext)
        }
        _ => cleaned[..MAX_FILE_NAME_LEN].to_string(),
    }
}

pub fn user_prefix(user_id: Uuid) -> String {
    format!("{user_id}/")
}

pub fn temp_prefix(user_id: Uuid) -> String {
    format!("{user_id}/{TEMP_SEGMENT}/")
}

/// `{user}/temp/{uuid}_{name}`
pub fn temp_key(user_id: Uuid, file_name: &str) -> String {
    format!(
        "{}{}_{}",
        temp_prefix(user_id),
        Uuid::new_v4().simple(),
        sanitize_file_name(file_name)
    )
}

pub fn permanent_key(user_id: Uuid, folder: Folder, file_name: &str) -> String {
    format!("{user_id}/{}/{}", folder.as_str(), file_name)
}

fn is_clean(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('/')
        && !key.contains('\\')
        && key.split('/').all(|seg| !seg.is_empty() && seg != "." && seg != "..")
}

pub fn is_owned_by(key: &str, user_id: Uuid) -> bool {
    is_clean(key) && key.starts_with(&user_prefix(user_id)) && key.len() > user_prefix(user_id).len()
}

pub fn is_temp(key: &str, user_id: Uuid) -> bool {
    is_clean(key) && key.starts_with(&temp_prefix(user_id)) && key.len() > temp_prefix(user_id).len()
}

/// Target key for promoting a temp object into `folder`.
pub fn promoted_key(temp: &str, user_id: Uuid, folder: Folder) -> Option<String> {
    if !is_temp(temp, user_id) {
        return None;
    }
    let name = &temp[temp_prefix(user_id).len()..];
    Some(permanent_key(user_id, folder, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_directories_and_symbols() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\AWS cert (1).pdf"), "AWS_cert__1_.pdf");
        assert_eq!(sanitize_file_name("résumé.pdf"), "r_sum_.pdf");
        assert_eq!(sanitize_file_name("..."), "file");
    }

    #[test]
    fn test_sanitize_truncates_and_keeps_extension() {
        let long = format!("{}.pdf", "a".repeat(300));
        let cleaned = sanitize_file_name(&long);
        assert_eq!(cleaned.len(), 100);
        assert!(cleaned.ends_with(".pdf"));
    }

    #[test]
    fn test_temp_key_layout() {
        let user = Uuid::new_v4();
        let key = temp_key(user, "cert.pdf");
        assert!(key.starts_with(&format!("{user}/temp/")));
        assert!(key.ends_with("_cert.pdf"));
        assert!(is_temp(&key, user));
        assert!(is_owned_by(&key, user));
    }

    #[test]
    fn test_ownership_rejects_other_users_and_traversal() {
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        assert!(!is_owned_by(&format!("{other}/temp/a.pdf"), user));
        assert!(!is_owned_by(&format!("{user}/../{other}/a.pdf"), user));
        assert!(!is_owned_by(&format!("{user}/"), user));
        assert!(!is_owned_by(&format!("/{user}/a.pdf"), user));
    }

    #[test]
    fn test_promoted_key() {
        let user = Uuid::new_v4();
        let temp = format!("{user}/temp/abc_cert.pdf");
        assert_eq!(
            promoted_key(&temp, user, Folder::Certificates),
            Some(format!("{user}/certificates/abc_cert.pdf"))
        );
        let permanent = format!("{user}/certificates/abc_cert.pdf");
        assert_eq!(promoted_key(&permanent, user, Folder::Certificates), None);
    }

    #[test]
    fn test_folder_wire_names() {
        let folder: Folder = serde_json::from_str("\"profile-images\"").unwrap();
        assert_eq!(folder, Folder::ProfileImages);
        assert_eq!(Folder::Certificates.as_str(), "certificates");
    }
}
