use ::url::{ParseError, Url};

use crate::EngineError;

const LOCAL_SCHEMES: &[&str] = &["file", "dir", "hd", "iso", "cd", "dvd"];

fn malformed(url: &str, reason: &str) -> EngineError {
    EngineError::MalformedUrl {
        url: url.to_owned(),
        reason: reason.to_owned(),
    }
}

/// Parse a repository URL. Scheme-only URLs such as `dir:` are refused
/// even though they parse.
pub fn parse(url: &str) -> Result<Url, EngineError> {
    let parsed = Url::parse(url).map_err(|e: ParseError| malformed(url, &e.to_string()))?;
    if !parsed.has_host() && parsed.path().is_empty() && parsed.query().is_none() {
        return Err(malformed(url, "empty path"));
    }
    Ok(parsed)
}

pub fn scheme_is_local(url: &str) -> Result<bool, EngineError> {
    let parsed = parse(url)?;
    Ok(LOCAL_SCHEMES.contains(&parsed.scheme()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_and_remote_schemes() {
        assert!(scheme_is_local("dir:///srv/repo").unwrap());
        assert!(scheme_is_local("DVD:/?devices=/dev/sr0").unwrap());
        assert!(scheme_is_local("iso:/?iso=/srv/SLE.iso").unwrap());
        assert!(!scheme_is_local("https://download.example.org/oss").unwrap());
    }

    #[test]
    fn malformed_urls_fail() {
        for url in [
            "no scheme here",
            "1http://x",
            "http:",
            "",
            "dir:",
            "http://",
            "https://exa mple.org/oss",
            "https://[::1/oss",
            "ftp:%%%",
        ] {
            let err = scheme_is_local(url).unwrap_err();
            assert!(
                matches!(err, EngineError::MalformedUrl { .. }),
                "{url}: {err}"
            );
        }
    }

    #[test]
    fn reason_comes_from_the_parser() {
        let err = parse("https://[::1/oss").unwrap_err();
        assert!(err.to_string().contains("invalid IPv6 address"), "{err}");
    }
}
