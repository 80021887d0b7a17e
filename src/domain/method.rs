//! HTTP method enumeration and wire conversion.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Closed set of HTTP methods the gateway routes.
///
/// `Unspecified` is never a valid request method; it is produced only when
/// input is unknown and rejected by request validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// Unknown or missing method
    #[default]
    Unspecified,
    /// GET
    Get,
    /// PUT
    Put,
    /// POST
    Post,
    /// DELETE
    Delete,
    /// PATCH
    Patch,
}

impl HttpMethod {
    /// Lowercase wire name of the method
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unspecified => "unspecified",
            Self::Get => "get",
            Self::Put => "put",
            Self::Post => "post",
            Self::Delete => "delete",
            Self::Patch => "patch",
        }
    }

    /// Parse a wire name; anything unknown maps to `Unspecified`
    #[must_use]
    pub fn from_wire(name: &str) -> Self {
        match name {
            "get" => Self::Get,
            "put" => Self::Put,
            "post" => Self::Post,
            "delete" => Self::Delete,
            "patch" => Self::Patch,
            _ => Self::Unspecified,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for HttpMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for HttpMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_wire(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [HttpMethod; 6] = [
        HttpMethod::Unspecified,
        HttpMethod::Get,
        HttpMethod::Put,
        HttpMethod::Post,
        HttpMethod::Delete,
        HttpMethod::Patch,
    ];

    #[test]
    fn wire_conversion_round_trips() {
        for method in ALL {
            assert_eq!(HttpMethod::from_wire(method.as_str()), method);
        }
    }

    #[test]
    fn unknown_wire_names_map_to_unspecified() {
        assert_eq!(HttpMethod::from_wire("head"), HttpMethod::Unspecified);
        assert_eq!(HttpMethod::from_wire("GET"), HttpMethod::Unspecified);
        assert_eq!(HttpMethod::from_wire(""), HttpMethod::Unspecified);
    }

    #[test]
    fn serde_round_trips() {
        for method in ALL {
            let json = serde_json::to_string(&method).unwrap();
            let back: HttpMethod = serde_json::from_str(&json).unwrap();
            assert_eq!(back, method);
        }

        let unknown: HttpMethod = serde_json::from_str("\"options\"").unwrap();
        assert_eq!(unknown, HttpMethod::Unspecified);
    }
}
