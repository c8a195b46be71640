extern crate alloc;

use alloc::{string::String, vec::Vec};
use core::fmt::Display;

#[cfg(feature = "json")]
use serde::Serialize;

use crate::{
    decode::ListElement,
    registry::{self, FieldRegistry, TaggedField},
    *,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The value tree cannot be written so that it decodes back to itself
    EncodingInvariantViolation(String),
    #[cfg(feature = "json")]
    Json(String),
}

impl EncodeError {
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::EncodingInvariantViolation(message) => message,
            #[cfg(feature = "json")]
            Self::Json(message) => message,
        }
    }
}

impl Display for EncodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.message())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EncodeError {}

fn violation(message: String) -> EncodeError {
    EncodeError::EncodingInvariantViolation(message)
}

pub trait Encode {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError>;

    fn encode_to_vec(&self) -> Result<Vec<u8>, EncodeError> {
        let mut encoder = Encoder::new();
        self.encode(&mut encoder)?;
        Ok(encoder.into())
    }

    #[cfg(feature = "json")]
    fn encode_to_json(&self) -> Result<String, EncodeError>
    where
        Self: Sized + Serialize,
    {
        serde_json::to_string(self)
            .map_err(|e| EncodeError::Json(alloc::format!("Error encoding JSON: {e:?}")))
    }
}

macro_rules! impl_encodable_int {
    ($($typ:ty),+) => {
        $(impl Encode for $typ {
            fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
                output.write_int(*self);
                Ok(())
            }
        })+
    };
}

impl_encodable_int!(u8, u16, u32, u64);

impl<T: Encode + ListElement> Encode for Vec<T> {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.write_prefixed(|inner| self.iter().try_for_each(|element| element.encode(inner)))
    }
}

impl Encode for HashedId8 {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.write_bytes(&self.0);
        Ok(())
    }
}

impl Encode for HashedId3 {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.write_bytes(&self.0);
        Ok(())
    }
}

impl Encode for IntX {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.write_length(self.0)
    }
}

impl Encode for Time64WithStandardDeviation {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.write_int(self.time);
        output.write_int(self.log_std_dev);
        Ok(())
    }
}

impl Encode for TwoDLocation {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.write_int(self.latitude);
        output.write_int(self.longitude);
        Ok(())
    }
}

impl Encode for ThreeDLocation {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.write_int(self.latitude);
        output.write_int(self.longitude);
        output.write_bytes(&self.elevation);
        Ok(())
    }
}

impl Encode for Duration {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.write_int(self.0);
        Ok(())
    }
}

impl Encode for SubjectAssurance {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.write_int(self.0);
        Ok(())
    }
}

impl Encode for TimeStartAndEnd {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.write_int(self.start);
        output.write_int(self.end);
        Ok(())
    }
}

impl Encode for TimeStartAndDuration {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.write_int(self.start);
        self.duration.encode(output)
    }
}

impl Encode for EccPoint {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.write_int(self.point_type());
        match self {
            EccPoint::XCoordinateOnly(x) | EccPoint::CompressedLsbY0(x) | EccPoint::CompressedLsbY1(x) => {
                output.write_bytes(x);
                Ok(())
            }
            EccPoint::Uncompressed { x, y } => {
                output.write_bytes(x);
                output.write_bytes(y);
                Ok(())
            }
            EccPoint::Unknown { point_type, data } => {
                if matches!(*point_type, 0 | 2 | 3 | 4) {
                    return Err(violation(alloc::format!(
                        "Unknown ECC point uses the defined point type {point_type}!"
                    )));
                }
                output.write_opaque(data)
            }
        }
    }
}

fn unknown_algorithm(algorithm: u8) -> Result<(), EncodeError> {
    match PublicKeyAlgorithm::from(algorithm) {
        PublicKeyAlgorithm::Other(_) => Ok(()),
        defined => Err(violation(alloc::format!(
            "Opaque data cannot be encoded for the defined algorithm {defined:?}!"
        ))),
    }
}

impl Encode for PublicKey {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.write_int(u8::from(self.algorithm()));
        match self {
            PublicKey::EcdsaNistP256(point) => point.encode(output),
            PublicKey::EciesNistP256 {
                supported_symmetric_algorithm,
                public_key,
            } => {
                output.write_int(u8::from(*supported_symmetric_algorithm));
                public_key.encode(output)
            }
            PublicKey::Unknown { algorithm, data } => {
                unknown_algorithm(*algorithm)?;
                output.write_opaque(data)
            }
        }
    }
}

impl Encode for EcdsaSignature {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        self.r.encode(output)?;
        output.write_bytes(&self.s);
        Ok(())
    }
}

impl Encode for Signature {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.write_int(u8::from(self.algorithm()));
        match self {
            Signature::EcdsaNistP256(signature) => signature.encode(output),
            Signature::Unknown { algorithm, data } => {
                if *algorithm == u8::from(PublicKeyAlgorithm::EcdsaNistP256WithSha256) {
                    return Err(violation(
                        "Opaque data cannot be encoded as ECDSA signature!".into(),
                    ));
                }
                output.write_opaque(data)
            }
        }
    }
}

impl Encode for AlgorithmDigest {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.write_int(u8::from(self.algorithm));
        self.digest.encode(output)
    }
}

impl Encode for SubjectInfo {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.write_int(u8::from(self.subject_type));
        output.write_opaque(&self.subject_name)
    }
}

impl Encode for ItsAidSsp {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        self.its_aid.encode(output)?;
        output.write_opaque(&self.service_specific_permissions)
    }
}

impl Encode for CircularRegion {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        self.center.encode(output)?;
        output.write_int(self.radius);
        Ok(())
    }
}

impl Encode for RectangularRegion {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        self.northwest.encode(output)?;
        self.southeast.encode(output)
    }
}

impl Encode for IdentifiedRegion {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.write_int(u8::from(self.region_dictionary));
        output.write_int(self.region_identifier);
        self.local_region.encode(output)
    }
}

impl Encode for GeographicRegion {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        match self {
            GeographicRegion::None => {
                output.write_int(0u8);
                Ok(())
            }
            GeographicRegion::Circle(circle) => {
                output.write_int(1u8);
                circle.encode(output)
            }
            GeographicRegion::Rectangle(rectangles) => {
                output.write_int(2u8);
                rectangles.encode(output)
            }
            GeographicRegion::Polygon(points) => {
                output.write_int(3u8);
                points.encode(output)
            }
            GeographicRegion::Identified(identified) => {
                output.write_int(4u8);
                identified.encode(output)
            }
            GeographicRegion::Unknown { region_type, data } => {
                if *region_type <= 4 {
                    return Err(violation(alloc::format!(
                        "Unknown region uses the defined region type {region_type}!"
                    )));
                }
                output.write_int(*region_type);
                output.write_opaque(data)
            }
        }
    }
}

impl Encode for EncryptionParameters {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        match self {
            EncryptionParameters::Aes128Ccm { nonce } => {
                output.write_int(u8::from(SymmetricAlgorithm::Aes128Ccm));
                output.write_bytes(nonce);
                Ok(())
            }
            EncryptionParameters::Unknown {
                symmetric_algorithm,
                data,
            } => {
                if SymmetricAlgorithm::from(*symmetric_algorithm) == SymmetricAlgorithm::Aes128Ccm {
                    return Err(violation(
                        "Opaque data cannot be encoded as AES-128-CCM parameters!".into(),
                    ));
                }
                output.write_int(*symmetric_algorithm);
                output.write_opaque(data)
            }
        }
    }
}

impl Encode for RecipientInfo {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        self.cert_id.encode(output)?;
        match &self.encrypted_key {
            EncryptedKey::EciesNistP256(EciesEncryptedKey { v, c, t }) => {
                output.write_int(u8::from(PublicKeyAlgorithm::EciesNistP256));
                v.encode(output)?;
                output.write_bytes(c);
                output.write_bytes(t);
                Ok(())
            }
            EncryptedKey::Unknown { algorithm, data } => {
                if PublicKeyAlgorithm::from(*algorithm) == PublicKeyAlgorithm::EciesNistP256 {
                    return Err(violation(
                        "Opaque data cannot be encoded as ECIES encrypted key!".into(),
                    ));
                }
                output.write_int(*algorithm);
                output.write_opaque(data)
            }
        }
    }
}

impl Encode for Payload {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.write_int(u8::from(self.payload_type));
        if self.payload_type == PayloadType::SignedExternal {
            if !self.data.is_empty() {
                return Err(violation(alloc::format!(
                    "Externally signed payload must not carry data, found {} bytes!",
                    self.data.len()
                )));
            }
            return Ok(());
        }
        output.write_opaque(&self.data)
    }
}

impl Encode for SignerInfo {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        registry::SIGNER_INFO.encode_field(self, output)
    }
}

impl Encode for SubjectAttribute {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        registry::SUBJECT_ATTRIBUTES.encode_field(self, output)
    }
}

impl Encode for ValidityRestriction {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        registry::VALIDITY_RESTRICTIONS.encode_field(self, output)
    }
}

fn message_registries(
    protocol_version: u8,
) -> Result<
    (
        &'static FieldRegistry<HeaderField>,
        &'static FieldRegistry<TrailerField>,
    ),
    EncodeError,
> {
    match (
        registry::header_fields(protocol_version),
        registry::trailer_fields(protocol_version),
    ) {
        (Some(headers), Some(trailers)) => Ok((headers, trailers)),
        _ => Err(violation(alloc::format!(
            "Protocol version {protocol_version} is not supported!"
        ))),
    }
}

/// Header fields outside of a message are written for the current protocol version.
impl Encode for HeaderField {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        message_registries(PROTOCOL_VERSION)?.0.encode_field(self, output)
    }
}

impl Encode for TrailerField {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        message_registries(PROTOCOL_VERSION)?.1.encode_field(self, output)
    }
}

fn encode_fields<F: TaggedField>(
    registry: &FieldRegistry<F>,
    fields: &[F],
    output: &mut Encoder,
) -> Result<(), EncodeError> {
    fields
        .iter()
        .try_for_each(|field| registry.encode_field(field, output))
}

impl Encode for SecuredMessage {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        let (headers, trailers) = message_registries(self.protocol_version)?;
        output.write_int(self.protocol_version);
        output.write_prefixed(|inner| encode_fields(headers, &self.header_fields, inner))?;
        self.payload.encode(output)?;
        output.write_prefixed(|inner| encode_fields(trailers, &self.trailer_fields, inner))
    }
}

impl SecuredMessage {
    /// Bytes covered by the message's first signature trailer field.
    ///
    /// The trailer list length includes the signature itself, so a message
    /// that is about to be signed must already carry a signature of the
    /// final size. The cleartext of unsecured payloads is not covered.
    pub fn signing_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        let (headers, trailers) = message_registries(self.protocol_version)?;
        let mut output = Encoder::new();
        output.write_int(self.protocol_version);
        output.write_prefixed(|inner| encode_fields(headers, &self.header_fields, inner))?;
        if self.payload.payload_type == PayloadType::Unsecured {
            output.write_int(u8::from(PayloadType::Unsecured));
        } else {
            self.payload.encode(&mut output)?;
        }

        let mut trailer = Encoder::new();
        encode_fields(trailers, &self.trailer_fields, &mut trailer)?;
        output.write_length(trailer.len() as u64)?;
        for field in &self.trailer_fields {
            if let TrailerField::Signature(_) = field {
                output.write_int(field.field_type());
                return Ok(output.into());
            }
            trailers.encode_field(field, &mut output)?;
        }
        Err(violation("Message carries no signature trailer field!".into()))
    }
}

impl Encode for Certificate {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        self.encode_to_be_signed(output)?;
        self.signature.encode(output)
    }
}

impl Certificate {
    /// Writes every field of the certificate except the signature.
    pub fn encode_to_be_signed(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.write_int(self.version);
        match self.version {
            1 => output.write_prefixed(|inner| self.signer_info.encode(inner))?,
            2 => self.signer_info.encode(output)?,
            version => {
                return Err(violation(alloc::format!(
                    "Certificate version {version} is not supported!"
                )))
            }
        }
        self.subject_info.encode(output)?;
        self.subject_attributes.encode(output)?;
        self.validity_restrictions.encode(output)
    }

    /// Bytes covered by the certificate's signature
    pub fn to_be_signed_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        let mut output = Encoder::new();
        self.encode_to_be_signed(&mut output)?;
        Ok(output.into())
    }
}
