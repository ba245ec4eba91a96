use serde::de::DeserializeOwned;
use std::marker::PhantomData;

/// Turns one raw frame into a typed message.
///
/// Any `Fn(&[u8]) -> anyhow::Result<T>` closure is a decoder:
///
/// ```
/// use livefeed_sdk::Decode;
///
/// let upper = |frame: &[u8]| -> anyhow::Result<String> {
///     Ok(std::str::from_utf8(frame)?.to_uppercase())
/// };
/// assert_eq!(upper.decode(b"tick").unwrap(), "TICK");
/// ```
pub trait Decode<T>: Send + Sync + 'static {
    fn decode(&self, frame: &[u8]) -> anyhow::Result<T>;
}

impl<T, F> Decode<T> for F
where
    F: Fn(&[u8]) -> anyhow::Result<T> + Send + Sync + 'static,
{
    fn decode(&self, frame: &[u8]) -> anyhow::Result<T> {
        self(frame)
    }
}

/// Default decoder: each frame is one JSON document.
pub struct JsonDecoder<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDecoder<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Decode<T> for JsonDecoder<T>
where
    T: DeserializeOwned + 'static,
{
    fn decode(&self, frame: &[u8]) -> anyhow::Result<T> {
        Ok(serde_json::from_slice(frame)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::{json, Value};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Reading {
        node: String,
        battery: u8,
    }

    #[test]
    fn test_json_value() {
        let decoder = JsonDecoder::<Value>::new();
        assert_eq!(decoder.decode(br#"{"v":1}"#).unwrap(), json!({"v": 1}));
        assert!(decoder.decode(b"{bad").is_err());
    }

    #[test]
    fn test_json_typed() {
        let decoder = JsonDecoder::<Reading>::new();
        let reading = decoder
            .decode(br#"{"node":"!a1b2c3d4","battery":87}"#)
            .unwrap();
        assert_eq!(
            reading,
            Reading {
                node: "!a1b2c3d4".into(),
                battery: 87
            }
        );
        assert!(decoder.decode(br#"{"node":"!a1b2c3d4"}"#).is_err());
    }
}
