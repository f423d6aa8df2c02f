use crate::config::PlatformEnv;
use crate::error::{IronlayerError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::net::{IpAddr, Ipv6Addr, ToSocketAddrs};
use std::path::{Component, Path, PathBuf};
use url::Url;

static GIT_REF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{4,40}$").unwrap());
static SAFE_REF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._/-]{0,254}$").unwrap());

pub fn validate_git_ref(candidate: &str) -> Result<()> {
    if GIT_REF_RE.is_match(candidate) || SAFE_REF_RE.is_match(candidate) {
        Ok(())
    } else {
        Err(IronlayerError::Validation(format!("'{candidate}' is not a valid git ref")))
    }
}

/// Resolves `requested` against `base` and asserts the result still lies
/// under `base`, rejecting `../` escapes and absolute-path overrides
/// (spec.md §4.7).
pub fn validate_contained_path(base: &Path, requested: &Path) -> Result<PathBuf> {
    let mut resolved = base.to_path_buf();
    for component in requested.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(IronlayerError::Validation(format!(
                    "path '{}' escapes the allow-listed base",
                    requested.display()
                )));
            }
        }
    }
    if !resolved.starts_with(base) {
        return Err(IronlayerError::Validation(format!(
            "path '{}' escapes the allow-listed base",
            requested.display()
        )));
    }
    Ok(resolved)
}

fn is_private_or_reserved(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified() || is_unique_local_v6(v6),
    }
}

fn is_unique_local_v6(addr: Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xfe00) == 0xfc00
}

/// Webhook URLs must be HTTPS (HTTP permitted only to loopback in dev) and
/// must resolve to a public, non-reserved address — an SSRF guard applied
/// at registration time, mirrored again at dispatch time in the event bus
/// (spec.md §4.7, §4.9).
pub fn validate_webhook_url(raw_url: &str, env: PlatformEnv) -> Result<()> {
    let url = Url::parse(raw_url).map_err(|e| IronlayerError::Validation(format!("invalid URL: {e}")))?;
    let host = url
        .host_str()
        .ok_or_else(|| IronlayerError::Validation("URL has no host".to_string()))?;

    let is_loopback_host = host == "localhost" || host == "127.0.0.1" || host == "::1";
    match url.scheme() {
        "https" => {}
        "http" if env == PlatformEnv::Dev && is_loopback_host => {}
        other => {
            return Err(IronlayerError::Validation(format!(
                "webhook URL scheme '{other}' is not permitted"
            )));
        }
    }

    let port = url.port_or_known_default().unwrap_or(443);
    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|e| IronlayerError::Validation(format!("could not resolve webhook host: {e}")))?;
    for addr in addrs {
        if is_loopback_host && env == PlatformEnv::Dev {
            continue;
        }
        if is_private_or_reserved(addr.ip()) {
            return Err(IronlayerError::Validation(format!(
                "webhook host '{host}' resolves to a private or reserved address"
            )));
        }
    }
    Ok(())
}

/// Escapes `%` and `_` wildcards in a user-supplied `LIKE` search term so it
/// is treated literally (spec.md §4.7).
pub fn escape_like_term(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

const FORMULA_PREFIXES: [char; 6] = ['=', '+', '-', '@', '\t', '\r'];

/// Prefixes CSV cells that could be interpreted as spreadsheet formulas
/// with a single quote to defuse formula injection (spec.md §4.7).
pub fn defuse_csv_cell(cell: &str) -> String {
    match cell.chars().next() {
        Some(c) if FORMULA_PREFIXES.contains(&c) => format!("'{cell}"),
        _ => cell.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn git_ref_accepts_hex_sha() {
        assert!(validate_git_ref("abc123").is_ok());
    }

    #[test]
    fn git_ref_rejects_shell_metacharacters() {
        assert!(validate_git_ref("main; rm -rf /").is_err());
    }

    #[test]
    fn path_containment_rejects_parent_escape() {
        let base = Path::new("/srv/repos/tenant-a");
        assert!(validate_contained_path(base, Path::new("../../etc/passwd")).is_err());
    }

    #[test]
    fn path_containment_allows_normal_subpath() {
        let base = Path::new("/srv/repos/tenant-a");
        let resolved = validate_contained_path(base, Path::new("models/orders.sql")).unwrap();
        assert_eq!(resolved, PathBuf::from("/srv/repos/tenant-a/models/orders.sql"));
    }

    #[test]
    fn csv_formula_prefix_is_defused() {
        assert_eq!(defuse_csv_cell("=cmd()"), "'=cmd()");
        assert_eq!(defuse_csv_cell("normal value"), "normal value");
    }

    #[test]
    fn like_escape_neutralises_wildcards() {
        assert_eq!(escape_like_term("50%_off"), "50\\%\\_off");
    }
}
