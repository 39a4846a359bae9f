//! Serde helpers for the JSON shapes used by chain configs, pre-states and
//! block fixtures: `0x`-prefixed hex for quantities and byte strings.

pub mod u64 {
    pub mod hex_str {
        use serde::{Deserialize, Deserializer, Serializer, de::Error};

        pub fn deserialize<'de, D>(d: D) -> Result<u64, D::Error>
        where
            D: Deserializer<'de>,
        {
            let value = String::deserialize(d)?;
            let digits = value.trim_start_matches("0x");
            u64::from_str_radix(digits, 16)
                .map_err(|_| D::Error::custom(format!("invalid hex quantity {value}")))
        }

        pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.serialize_str(&format!("{value:#x}"))
        }
    }
}

pub mod bytes {
    use ::bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn deserialize<'de, D>(d: D) -> Result<Bytes, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(d)?;
        let bytes = hex::decode(value.trim_start_matches("0x"))
            .map_err(|e| D::Error::custom(e.to_string()))?;
        Ok(Bytes::from(bytes))
    }

    pub fn serialize<S>(value: &Bytes, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(value)))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        #[serde(with = "crate::serde_utils::u64::hex_str")]
        number: u64,
        #[serde(with = "crate::serde_utils::bytes")]
        data: ::bytes::Bytes,
    }

    #[test]
    fn test_hex_fields_roundtrip_through_json() {
        let json = r#"{"number":"0x2a","data":"0x6001"}"#;
        let sample: Sample = serde_json::from_str(json).expect("valid json");
        assert_eq!(sample.number, 42);
        assert_eq!(sample.data.as_ref(), &[0x60, 0x01]);
        assert_eq!(serde_json::to_string(&sample).expect("serializable"), json);
    }
}
