use crate::ipfs::config::{DEFAULT_ACCEPTED_CID_PREFIX, DEFAULT_ALTERNATE_GATEWAY};

pub const IPFS_SCHEME: &str = "ipfs://";

const IPFS_PATH_SEGMENT: &str = "/ipfs/";

/// Returns true only for `ipfs://` URIs whose CID starts with the accepted
/// prefix. This is a narrowing filter, not a CID validator: the rest of the
/// hash is not checked.
pub fn is_valid_metadata_uri(uri: &str) -> bool {
    has_accepted_prefix(uri, &[DEFAULT_ACCEPTED_CID_PREFIX])
}

pub(crate) fn has_accepted_prefix<S: AsRef<str>>(uri: &str, prefixes: &[S]) -> bool {
    match uri.strip_prefix(IPFS_SCHEME) {
        Some(cid) => prefixes
            .iter()
            .map(AsRef::as_ref)
            .any(|prefix| !prefix.is_empty() && cid.starts_with(prefix)),
        None => false,
    }
}

/// Accepts either a bare host (`ipfs.io`) or a full base URL
/// (`http://127.0.0.1:8080`) and returns the base URL without a trailing slash.
fn gateway_base(gateway: &str) -> String {
    let gateway = gateway.trim_end_matches('/');
    if gateway.starts_with("http://") || gateway.starts_with("https://") {
        gateway.to_string()
    } else {
        format!("https://{gateway}")
    }
}

/// Maps `ipfs://{cid}` to `https://{gateway}/ipfs/{cid}`. Anything that is
/// not an `ipfs://` URI is returned unchanged.
pub fn to_gateway_url(uri: &str, gateway: &str) -> String {
    match uri.strip_prefix(IPFS_SCHEME) {
        Some(path) => format!("{}{IPFS_PATH_SEGMENT}{path}", gateway_base(gateway)),
        None => uri.to_string(),
    }
}

pub fn to_alternate_gateway_url(uri: &str) -> String {
    to_gateway_url(uri, DEFAULT_ALTERNATE_GATEWAY)
}

/// Reverse of [`to_gateway_url`]: recovers `ipfs://{cid}[/path]` from a path
/// gateway URL. Query strings and fragments are dropped, so a URI carrying
/// one does not survive the round trip through [`to_gateway_url`].
pub fn from_gateway_url(url: &str) -> Option<String> {
    let after_scheme = url.split_once("://").map(|(_, rest)| rest)?;
    let idx = after_scheme.find(IPFS_PATH_SEGMENT)?;
    let path = &after_scheme[idx + IPFS_PATH_SEGMENT.len()..];
    let end = path.find(&['?', '#'][..]).unwrap_or(path.len());
    let path = &path[..end];
    if path.is_empty() || path.starts_with('/') {
        return None;
    }
    Some(ipfs_uri(path))
}

/// Rewrites an image URL served by the primary gateway onto the alternate
/// gateway. Returns None for URLs that did not come from the primary gateway,
/// in which case there is nothing left to fall back to.
pub fn alternate_image_url(image_url: &str, primary: &str, alternate: &str) -> Option<String> {
    let primary_prefix = format!("{}{IPFS_PATH_SEGMENT}", gateway_base(primary));
    image_url
        .strip_prefix(&primary_prefix)
        .filter(|path| !path.is_empty())
        .map(|path| to_gateway_url(&ipfs_uri(path), alternate))
}

pub fn ipfs_uri(cid: &str) -> String {
    format!("{IPFS_SCHEME}{cid}")
}

/// The CID component of an `ipfs://` URI, without any sub-path.
pub fn extract_cid(uri: &str) -> Option<&str> {
    let path = uri.strip_prefix(IPFS_SCHEME)?;
    let cid = path.split('/').next().unwrap_or(path);
    if cid.is_empty() {
        None
    } else {
        Some(cid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CID: &str = "bafkreigh2akiscaildcqabsyg3dfr6chu3fgpregiymsck7e7aqa4s52zy";

    mod is_valid_metadata_uri_tests {
        use super::*;

        #[test]
        fn accepts_raw_cidv1() {
            assert!(is_valid_metadata_uri(&format!("ipfs://{CID}")));
        }

        #[test]
        fn rejects_everything_without_the_prefix() {
            assert!(!is_valid_metadata_uri(""));
            assert!(!is_valid_metadata_uri("ipfs://"));
            assert!(!is_valid_metadata_uri(CID));
            assert!(!is_valid_metadata_uri(&format!("https://ipfs.io/ipfs/{CID}")));
            assert!(!is_valid_metadata_uri(&format!("IPFS://{CID}")));
            assert!(!is_valid_metadata_uri(&format!(" ipfs://{CID}")));
        }

        #[test]
        fn rejects_other_valid_cid_encodings() {
            assert!(!is_valid_metadata_uri(
                "ipfs://QmXoypizjW3WknFiJnKLwHCnL72vedxjQkDDP1mXWo6uco"
            ));
            assert!(!is_valid_metadata_uri(
                "ipfs://bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi"
            ));
        }

        #[test]
        fn malformed_hash_with_matching_prefix_still_passes() {
            assert!(is_valid_metadata_uri("ipfs://bafkrei!!not-a-hash"));
        }

        #[test]
        fn empty_prefixes_never_match() {
            assert!(!has_accepted_prefix(&format!("ipfs://{CID}"), &[""]));
        }
    }

    mod gateway_url_tests {
        use super::*;

        #[test]
        fn maps_onto_gateway_host() {
            let url = to_gateway_url(&format!("ipfs://{CID}"), "gateway.pinata.cloud");
            assert_eq!(url, format!("https://gateway.pinata.cloud/ipfs/{CID}"));
            assert_eq!(url.matches(CID).count(), 1);
            assert!(!url.contains("ipfs://"));
        }

        #[test]
        fn accepts_full_base_urls() {
            assert_eq!(
                to_gateway_url("ipfs://bafkreiabc/meta.json", "http://127.0.0.1:8080/"),
                "http://127.0.0.1:8080/ipfs/bafkreiabc/meta.json"
            );
        }

        #[test]
        fn passes_through_non_ipfs_uris() {
            let https = "https://example.com/image.png";
            assert_eq!(to_gateway_url(https, "gateway.pinata.cloud"), https);
            assert_eq!(to_gateway_url("", "gateway.pinata.cloud"), "");
            assert_eq!(to_alternate_gateway_url(https), https);
        }

        #[test]
        fn alternate_gateway_is_ipfs_io() {
            assert_eq!(
                to_alternate_gateway_url(&format!("ipfs://{CID}")),
                format!("https://ipfs.io/ipfs/{CID}")
            );
        }
    }

    mod reverse_mapping_tests {
        use super::*;

        #[test]
        fn round_trips_accepted_uris() {
            let uris = [
                format!("ipfs://{CID}"),
                "ipfs://bafkreiabcdefghijklmnopqrstuvwxyz234567".to_string(),
                "ipfs://bafkrei!!not-a-hash".to_string(),
            ];
            for uri in uris {
                for host in ["gateway.pinata.cloud", "ipfs.io", "http://localhost:5001"] {
                    let url = to_gateway_url(&uri, host);
                    assert_eq!(from_gateway_url(&url).as_deref(), Some(uri.as_str()));
                }
            }
        }

        #[test]
        fn strips_query_and_fragment() {
            assert_eq!(
                from_gateway_url(&format!("https://ipfs.io/ipfs/{CID}?filename=a.png#x")),
                Some(format!("ipfs://{CID}"))
            );
        }

        #[test]
        fn rejects_non_gateway_urls() {
            assert!(from_gateway_url("https://example.com/image.png").is_none());
            assert!(from_gateway_url("https://ipfs.io/ipfs/").is_none());
            assert!(from_gateway_url(&format!("ipfs://{CID}")).is_none());
            assert!(from_gateway_url("not a url").is_none());
        }
    }

    mod alternate_image_url_tests {
        use super::*;

        #[test]
        fn swaps_primary_for_alternate() {
            let image = format!("https://gateway.pinata.cloud/ipfs/{CID}");
            assert_eq!(
                alternate_image_url(&image, "gateway.pinata.cloud", "ipfs.io"),
                Some(format!("https://ipfs.io/ipfs/{CID}"))
            );
        }

        #[test]
        fn ignores_urls_from_other_hosts() {
            let image = format!("https://ipfs.io/ipfs/{CID}");
            assert!(alternate_image_url(&image, "gateway.pinata.cloud", "ipfs.io").is_none());
            assert!(alternate_image_url(
                "https://gateway.pinata.cloud/ipfs/",
                "gateway.pinata.cloud",
                "ipfs.io"
            )
            .is_none());
        }
    }

    #[test]
    fn extracts_cid_without_subpath() {
        assert_eq!(extract_cid(&format!("ipfs://{CID}/0.json")), Some(CID));
        assert_eq!(extract_cid(&format!("ipfs://{CID}")), Some(CID));
        assert_eq!(extract_cid("ipfs://"), None);
        assert_eq!(extract_cid("https://example.com"), None);
        assert_eq!(ipfs_uri(CID), format!("ipfs://{CID}"));
    }

    #[test]
    fn reverse_mapping_drops_query_and_fragment() {
        let uri = format!("ipfs://{CID}?x=1");
        assert!(is_valid_metadata_uri(&uri));
        let url = to_gateway_url(&uri, "gateway.pinata.cloud");
        assert_eq!(from_gateway_url(&url), Some(format!("ipfs://{CID}")));
        assert_eq!(
            from_gateway_url(&format!("https://ipfs.io/ipfs/{CID}#top")),
            Some(format!("ipfs://{CID}"))
        );
    }
}
