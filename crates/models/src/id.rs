/// Opaque identifier of an alert, assigned by the classifier which created it.
/// Ids render as 16 lower-case hexadecimal characters. When parsed, `:`
/// separators are ignored and short forms are zero-padded.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u64);

impl Id {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Id {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl std::str::FromStr for Id {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.chars().filter(|c| *c != ':').collect();
        u64::from_str_radix(&digits, 16).map(Self)
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl std::fmt::Debug for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl serde::Serialize for Id {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Id {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = std::borrow::Cow::<'de, str>::deserialize(deserializer)?;
        value
            .parse()
            .map_err(|err| serde::de::Error::custom(format!("invalid id {value:?}: {err}")))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_id_parsing_and_display() {
        let id: Id = "0808:0808:0808:0808".parse().unwrap();
        assert_eq!(id, Id::from(0x0808_0808_0808_0808));
        assert_eq!(id.to_string(), "0808080808080808");

        // Short forms are left-padded with zeros.
        let short: Id = "2a".parse().unwrap();
        assert_eq!(short.as_u64(), 42);
        assert_eq!(format!("{short:?}"), "000000000000002a");

        assert!("not-hex".parse::<Id>().is_err());
        assert!("".parse::<Id>().is_err());
    }

    #[test]
    fn test_id_serde() {
        let id = Id::from(0x0102030405060708);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""0102030405060708""#);
        assert_eq!(serde_json::from_str::<Id>(&json).unwrap(), id);

        let err = serde_json::from_str::<Id>(r#""zz""#).unwrap_err();
        assert!(err.to_string().starts_with(r#"invalid id "zz":"#), "{err}");
    }
}
