//! The text form: `/name/value` pairs, value absent for zero-size
//! protocols, with a path-terminal tail for `unix`.

use crate::component::Component;
use crate::errors::{ParseError, Result};
use crate::registry::Registry;

/// Tokenize the text form into a validated sequence of components.
///
/// The empty string and a lone `/` both denote the empty multiaddr.
pub(crate) fn parse_components(reg: &Registry, s: &str) -> Result<Vec<Component>> {
    if s.is_empty() || s == "/" {
        return Ok(Vec::new());
    }
    let rest = match s.strip_prefix('/') {
        Some(rest) => rest,
        None => return Err(ParseError::MissingLeadingSlash.into()),
    };

    let mut parts = Vec::new();
    let mut tokens = rest.split('/');
    while let Some(name) = tokens.next() {
        if name.is_empty() {
            // double or trailing slash
            return Err(ParseError::UnknownProtocolName(String::new()).into());
        }
        let proto = reg
            .lookup_name(name)
            .cloned()
            .ok_or_else(|| ParseError::UnknownProtocolName(name.to_string()))?;

        let comp = if proto.is_path() {
            // the remainder of the string, embedded slashes included, is the value
            let tail: Vec<&str> = tokens.by_ref().collect();
            if tail.is_empty() {
                return Err(ParseError::MissingValue(proto.name().to_string()).into());
            }
            Component::from_text(proto, Some(&tail.join("/")))?
        } else if proto.is_zero_size() {
            Component::from_text(proto, None)?
        } else {
            let value = match tokens.next() {
                Some(value) if !value.is_empty() => value,
                _ => return Err(ParseError::MissingValue(proto.name().to_string()).into()),
            };
            Component::from_text(proto, Some(value))?
        };
        parts.push(comp);
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{CodecError, Error};

    fn parse(s: &str) -> Result<Vec<Component>> {
        parse_components(Registry::global(), s)
    }

    fn text(parts: &[Component]) -> String {
        parts.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn empty_forms() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("/").unwrap().is_empty());
    }

    #[test]
    fn leading_slash_required() {
        assert_eq!(
            parse("ip4/1.2.3.4"),
            Err(ParseError::MissingLeadingSlash.into())
        );
    }

    #[test]
    fn basic_pairs() {
        let parts = parse("/ip4/127.0.0.1/tcp/4001").unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(text(&parts), "/ip4/127.0.0.1/tcp/4001");
    }

    #[test]
    fn zero_size_has_no_value() {
        let parts = parse("/ip4/1.2.3.4/tcp/80/ws/p2p-circuit").unwrap();
        assert_eq!(parts.len(), 4);
        // no trailing slash after the final zero-size component
        assert_eq!(text(&parts), "/ip4/1.2.3.4/tcp/80/ws/p2p-circuit");
    }

    #[test]
    fn unknown_name() {
        assert_eq!(
            parse("/smtp/25"),
            Err(ParseError::UnknownProtocolName("smtp".to_string()).into())
        );
    }

    #[test]
    fn missing_value() {
        assert_eq!(
            parse("/ip4"),
            Err(ParseError::MissingValue("ip4".to_string()).into())
        );
        assert_eq!(
            parse("/ip4//tcp/1"),
            Err(ParseError::MissingValue("ip4".to_string()).into())
        );
    }

    #[test]
    fn empty_segment_rejected() {
        assert!(parse("//ip4/1.2.3.4").is_err());
        assert!(parse("/ip4/1.2.3.4/").is_err());
        assert!(parse("/ip4/1.2.3.4//tcp/1").is_err());
    }

    #[test]
    fn unix_consumes_the_tail() {
        let parts = parse("/unix/var/run/app.sock").unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].value(), b"var/run/app.sock");
        assert_eq!(text(&parts), "/unix/var/run/app.sock");
    }

    #[test]
    fn unix_after_other_components() {
        let parts = parse("/ip4/1.2.3.4/tcp/80/unix/a/b").unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2].value(), b"a/b");
    }

    #[test]
    fn codec_error_names_the_protocol() {
        assert_eq!(
            parse("/ip4/256.0.0.1"),
            Err(Error::Codec {
                proto: "ip4".to_string(),
                kind: CodecError::InvalidIp,
            })
        );
        assert_eq!(
            parse("/tcp/70000"),
            Err(Error::Codec {
                proto: "tcp".to_string(),
                kind: CodecError::PortOutOfRange,
            })
        );
    }

    #[test]
    fn ipfs_parses_and_renders_as_p2p() {
        let parts = parse("/ipfs/QmNnooDu7bfjPFoTZYxMNLWUQJyrVwtbZg5gBMjTezGAJN").unwrap();
        assert_eq!(
            text(&parts),
            "/p2p/QmNnooDu7bfjPFoTZYxMNLWUQJyrVwtbZg5gBMjTezGAJN"
        );
    }
}
