//! Canonical abuse-detector identifiers.

use std::fmt;

/// The identity an abuse check is keyed on: a payer address, a client IP, or
/// both, plus a suffixed variant for the expired-token sub-counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    AddressAndIp { address: String, ip: String },
    Address(String),
    Ip(String),
    IpExpired(String),
}

impl Identifier {
    pub fn address_and_ip(address: &str, ip: &str) -> Self {
        Self::AddressAndIp {
            address: address.to_lowercase(),
            ip: ip.to_string(),
        }
    }

    pub fn ip(ip: &str) -> Self {
        Self::Ip(ip.to_string())
    }

    pub fn ip_expired(ip: &str) -> Self {
        Self::IpExpired(ip.to_string())
    }

    /// Parse a canonical form back into an `Identifier`, the inverse of
    /// `Display`. Used by the admin abuse endpoints, which take an
    /// identifier as an opaque path segment.
    pub fn parse(raw: &str) -> Result<Self, String> {
        if let Some(ip) = raw.strip_prefix("ip:").and_then(|s| s.strip_suffix(":expired")) {
            return Ok(Self::IpExpired(ip.to_string()));
        }
        if let Some(rest) = raw.strip_prefix("addr:") {
            return Ok(match rest.split_once("_ip:") {
                Some((address, ip)) => Self::AddressAndIp {
                    address: address.to_string(),
                    ip: ip.to_string(),
                },
                None => Self::Address(rest.to_string()),
            });
        }
        if let Some(ip) = raw.strip_prefix("ip:") {
            return Ok(Self::Ip(ip.to_string()));
        }
        Err(format!("unrecognized identifier: {raw}"))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressAndIp { address, ip } => write!(f, "addr:{address}_ip:{ip}"),
            Self::Address(address) => write!(f, "addr:{}", address.to_lowercase()),
            Self::Ip(ip) => write!(f, "ip:{ip}"),
            Self::IpExpired(ip) => write!(f, "ip:{ip}:expired"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_forms_match_spec() {
        assert_eq!(
            Identifier::address_and_ip("0xABC", "1.2.3.4").to_string(),
            "addr:0xabc_ip:1.2.3.4"
        );
        assert_eq!(Identifier::Address("0xABC".into()).to_string(), "addr:0xabc");
        assert_eq!(Identifier::ip("1.2.3.4").to_string(), "ip:1.2.3.4");
        assert_eq!(
            Identifier::ip_expired("1.2.3.4").to_string(),
            "ip:1.2.3.4:expired"
        );
    }

    #[test]
    fn parse_round_trips_every_canonical_form() {
        for id in [
            Identifier::address_and_ip("0xabc", "1.2.3.4"),
            Identifier::Address("0xabc".into()),
            Identifier::ip("1.2.3.4"),
            Identifier::ip_expired("1.2.3.4"),
        ] {
            let rendered = id.to_string();
            assert_eq!(Identifier::parse(&rendered).unwrap(), id);
        }
    }

    #[test]
    fn parse_rejects_unrecognized_forms() {
        assert!(Identifier::parse("whatever").is_err());
    }
}
