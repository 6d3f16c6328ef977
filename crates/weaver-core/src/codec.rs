//! Postcard helpers for opaque encodings
//!
//! Types without introspectable state can still be woven by handing the
//! engine an opaque byte encoding. Postcard is the default format.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CoreError;
use crate::value::{Object, ObjectRef, new_object};

/// Encode a value for [`Object::encode_opaque`]
pub fn encode_postcard<T: Serialize>(value: &T) -> Result<Option<Vec<u8>>, CoreError> {
    Ok(Some(postcard::to_allocvec(value)?))
}

/// Decode an opaque payload back into a shared object
pub fn decode_postcard<T: Object + DeserializeOwned>(bytes: &[u8]) -> Result<ObjectRef, CoreError> {
    let value: T = postcard::from_bytes(bytes)?;
    Ok(new_object(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_tag::{TypeDescriptor, TypeTag};
    use crate::value::downcast_ref;
    use crate::version::Version;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Weights {
        values: Vec<f32>,
    }

    impl Object for Weights {
        fn descriptor(&self) -> TypeDescriptor {
            TypeTag::new(["tests"], "Weights").with_version(Version::new(0, 1, 0))
        }

        fn encode_opaque(&self) -> Result<Option<Vec<u8>>, CoreError> {
            encode_postcard(self)
        }
    }

    #[test]
    fn test_postcard_round_trip() {
        let weights = Weights {
            values: vec![0.5, 1.5],
        };
        let bytes = weights.encode_opaque().unwrap().unwrap();
        let object = decode_postcard::<Weights>(&bytes).unwrap();
        assert_eq!(*downcast_ref::<Weights>(&object).unwrap(), weights);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(
            decode_postcard::<Weights>(&[0xff, 0xff, 0xff]),
            Err(CoreError::Codec(_))
        ));
    }
}
