use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use time::OffsetDateTime;

pub(crate) const UPLOADS_DIR: &str = "uploads";

/// Largest accepted attachment (10 MiB).
pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttachmentType {
    Pdf,
    Doc,
    Docx,
    Png,
    Jpeg,
}

impl AttachmentType {
    fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "application/pdf" => Some(Self::Pdf),
            "application/msword" => Some(Self::Doc),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Self::Docx)
            }
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "doc" => Some(Self::Doc),
            "docx" => Some(Self::Docx),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Doc => "doc",
            Self::Docx => "docx",
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    pub(crate) fn content_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Doc => "application/msword",
            Self::Docx => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    fn matches_signature(self, signature: Signature) -> bool {
        matches!(
            (self, signature),
            (Self::Pdf, Signature::Pdf)
                | (Self::Doc, Signature::Ole)
                | (Self::Docx, Signature::Zip)
                | (Self::Png, Signature::Png)
                | (Self::Jpeg, Signature::Jpeg)
        )
    }
}

/// Leading magic bytes. Zip and OLE containers need a declared type to be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signature {
    Pdf,
    Ole,
    Zip,
    Png,
    Jpeg,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("invalid upload path")]
    BadPath,
    #[error("file not found")]
    NotFound,
    #[error("upload body was empty")]
    EmptyBody,
    #[error("file exceeds the 10 MiB limit")]
    TooLarge,
    #[error("unsupported file type; use PDF, DOC, DOCX, PNG or JPG")]
    UnsupportedType,
    #[error("upload i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoredUpload {
    pub(crate) rel_path: String,
    pub(crate) display_name: String,
}

impl StoredUpload {
    pub(crate) fn url(&self) -> String {
        format!("/files/{}", self.rel_path)
    }
}

/// Check size and type without touching the filesystem.
pub(crate) fn validate_attachment(
    bytes: &[u8],
    content_type: Option<&str>,
    filename: Option<&str>,
) -> Result<AttachmentType, UploadError> {
    if bytes.is_empty() {
        return Err(UploadError::EmptyBody);
    }
    if bytes.len() > MAX_ATTACHMENT_BYTES {
        return Err(UploadError::TooLarge);
    }
    detect_attachment_type(content_type, filename, bytes)
}

pub(crate) fn store_upload(
    root: &Path,
    bytes: &[u8],
    content_type: Option<&str>,
    filename: Option<&str>,
) -> Result<StoredUpload, UploadError> {
    let kind = validate_attachment(bytes, content_type, filename)?;
    let now = OffsetDateTime::now_utc();
    let year = now.year();
    let month = u8::from(now.month());
    let day = now.day();

    let base = sanitize_base_name(filename);
    let display_name = display_name(filename, &base, kind);
    let dir = format!("{}/{:04}/{:02}", UPLOADS_DIR, year, month);

    for _ in 0..10 {
        let suffix = random_suffix();
        let file_name = format!(
            "{}-{:04}{:02}{:02}-{}.{}",
            base,
            year,
            month,
            day,
            suffix,
            kind.extension()
        );
        let rel_path = format!("{dir}/{file_name}");
        let rel_path_buf = Path::new(&rel_path);
        ensure_parent_dirs(root, rel_path_buf)?;
        let target = root.join(rel_path_buf);
        if target.exists() {
            continue;
        }
        atomic_write_bytes(&target, bytes)?;
        return Ok(StoredUpload {
            rel_path,
            display_name,
        });
    }

    Err(UploadError::Io(std::io::Error::new(
        ErrorKind::AlreadyExists,
        "failed to allocate upload name",
    )))
}

/// Remove a stored artifact by its `/files/...` URL. Failures are reported, not fatal.
pub(crate) fn remove_upload(root: &Path, url: &str) -> Result<(), UploadError> {
    let rel_path = url.strip_prefix("/files/").ok_or(UploadError::BadPath)?;
    let resolved = resolve_file_path(root, rel_path)?;
    std::fs::remove_file(resolved)?;
    Ok(())
}

pub(crate) fn resolve_file_path(root: &Path, rel_path: &str) -> Result<PathBuf, UploadError> {
    let safe_path = relative_path_to_path(rel_path).ok_or(UploadError::BadPath)?;
    if safe_path.components().next() != Some(Component::Normal(std::ffi::OsStr::new(UPLOADS_DIR))) {
        return Err(UploadError::BadPath);
    }
    let mut current = root.to_path_buf();

    for component in safe_path.components() {
        let component = match component {
            Component::Normal(component) => component,
            _ => return Err(UploadError::BadPath),
        };
        current.push(component);
        match std::fs::symlink_metadata(&current) {
            Ok(metadata) => {
                if metadata.file_type().is_symlink() {
                    return Err(UploadError::BadPath);
                }
            }
            Err(err) if err.kind() == ErrorKind::NotFound => return Err(UploadError::NotFound),
            Err(err) => return Err(UploadError::Io(err)),
        }
    }

    let root = std::fs::canonicalize(root)?;
    let resolved = std::fs::canonicalize(&current).map_err(|err| match err.kind() {
        ErrorKind::NotFound => UploadError::NotFound,
        _ => UploadError::Io(err),
    })?;
    if !resolved.starts_with(&root) {
        return Err(UploadError::BadPath);
    }
    if !resolved.is_file() {
        return Err(UploadError::NotFound);
    }
    Ok(resolved)
}

pub(crate) fn content_type_for_path(rel_path: &str) -> Option<&'static str> {
    let ext = Path::new(rel_path).extension()?.to_str()?;
    AttachmentType::from_extension(ext).map(AttachmentType::content_type)
}

fn detect_attachment_type(
    content_type: Option<&str>,
    filename: Option<&str>,
    bytes: &[u8],
) -> Result<AttachmentType, UploadError> {
    let signature = sniff_signature(bytes).ok_or(UploadError::UnsupportedType)?;
    let content_type = content_type.filter(|value| !value.starts_with("application/octet-stream"));
    if let Some(content_type) = content_type {
        let declared =
            AttachmentType::from_content_type(content_type).ok_or(UploadError::UnsupportedType)?;
        if !declared.matches_signature(signature) {
            return Err(UploadError::UnsupportedType);
        }
        return Ok(declared);
    }

    let from_name = filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .and_then(AttachmentType::from_extension);
    match (signature, from_name) {
        (_, Some(kind)) if kind.matches_signature(signature) => Ok(kind),
        (Signature::Pdf, None) => Ok(AttachmentType::Pdf),
        (Signature::Png, None) => Ok(AttachmentType::Png),
        (Signature::Jpeg, None) => Ok(AttachmentType::Jpeg),
        _ => Err(UploadError::UnsupportedType),
    }
}

fn sniff_signature(bytes: &[u8]) -> Option<Signature> {
    if bytes.starts_with(b"%PDF-") {
        return Some(Signature::Pdf);
    }
    if bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]) {
        return Some(Signature::Ole);
    }
    if bytes.starts_with(b"PK\x03\x04") {
        return Some(Signature::Zip);
    }
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some(Signature::Png);
    }
    if bytes.len() >= 3 && bytes[0] == 0xFF && bytes[1] == 0xD8 && bytes[2] == 0xFF {
        return Some(Signature::Jpeg);
    }
    None
}

fn display_name(filename: Option<&str>, base: &str, kind: AttachmentType) -> String {
    filename
        .and_then(|name| Path::new(name).file_name())
        .and_then(|name| name.to_str())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{base}.{}", kind.extension()))
}

fn sanitize_base_name(filename: Option<&str>) -> String {
    let base = filename
        .and_then(|name| Path::new(name).file_stem().and_then(|stem| stem.to_str()))
        .unwrap_or("attachment");
    let mut out = String::with_capacity(base.len());
    let mut last_dash = false;

    for ch in base.chars() {
        if ch.is_ascii_alphanumeric() {
            last_dash = false;
            out.push(ch.to_ascii_lowercase());
        } else if !last_dash && !out.is_empty() {
            last_dash = true;
            out.push('-');
        }
    }

    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "attachment".to_string()
    } else if trimmed.len() > 40 {
        trimmed[..40].trim_end_matches('-').to_string()
    } else {
        trimmed.to_string()
    }
}

fn random_suffix() -> String {
    let value: u32 = rand::random();
    format!("{:08x}", value)
}

fn relative_path_to_path(rel_path: &str) -> Option<PathBuf> {
    if rel_path.is_empty() {
        return None;
    }
    let path = Path::new(rel_path);
    if path.is_absolute() {
        return None;
    }
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => components.push(part),
            _ => return None,
        }
    }
    if components.is_empty() {
        return None;
    }
    Some(components.iter().collect())
}

fn ensure_parent_dirs(root: &Path, rel_path: &Path) -> Result<(), UploadError> {
    let Some(parent) = rel_path.parent() else {
        return Ok(());
    };
    let mut current = root.to_path_buf();
    for component in parent.components() {
        let component = match component {
            Component::Normal(component) => component,
            _ => return Err(UploadError::BadPath),
        };
        current.push(component);
        match std::fs::symlink_metadata(&current) {
            Ok(metadata) => {
                if metadata.file_type().is_symlink() || !metadata.is_dir() {
                    return Err(UploadError::BadPath);
                }
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                std::fs::create_dir(&current)?;
            }
            Err(err) => return Err(UploadError::Io(err)),
        }
    }
    Ok(())
}

fn atomic_write_bytes(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| std::io::Error::other("missing parent directory"))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload.bin");
    let pid = std::process::id();

    for attempt in 0..10u32 {
        let temp_name = format!(".{}.tmp-{}-{}", file_name, pid, attempt);
        let temp_path = parent.join(temp_name);
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
        {
            Ok(mut file) => {
                use std::io::Write as _;
                file.write_all(contents)?;
                file.flush()?;
                std::fs::rename(&temp_path, path)?;
                return Ok(());
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        ErrorKind::AlreadyExists,
        "failed to create temp file",
    ))
}
