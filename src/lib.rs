#![doc = include_str!("../README.md")]
#![cfg(not(doctest))]
#![cfg_attr(not(any(test, feature = "std")), no_std)]
extern crate alloc;

use alloc::{boxed::Box, vec::Vec};

#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

mod archive;
mod decode;
mod encode;
pub mod length;
pub mod registry;
#[cfg(test)]
mod test_vectors;
mod trust;
#[cfg(feature = "validate")]
mod validate;

pub use archive::Encoder;
pub use decode::{
    Cause, Decode, DecodeError, DecodeOptions, Decoded, UnknownFieldPolicy,
    DEFAULT_MAX_CHAIN_DEPTH, MAX_CHAIN_DEPTH_LIMIT,
};
pub use encode::{Encode, EncodeError};
pub use registry::{FieldCategory, FieldRegistry, TaggedField};
pub use trust::{
    resolve_signer, CertificateStore, ResolvedSigner, Signer, SigningError,
    UnresolvedSignerReference, Verifier,
};
#[cfg(feature = "validate")]
pub use validate::{EcdsaNistP256, MemoryStore, Validate, ValidationError, ValidationResult};

/// Protocol version of secured messages according to ETSI TS 103 097 v1.2.1
pub const PROTOCOL_VERSION: u8 = 2;

/// Defines a one-byte wire enumeration. Values without a dedicated
/// variant decode to `Other` and re-encode unchanged.
macro_rules! byte_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
            Other(u8),
        }

        impl From<u8> for $name {
            fn from(value: u8) -> Self {
                match value {
                    $($value => Self::$variant,)+
                    other => Self::Other(other),
                }
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> Self {
                match value {
                    $($name::$variant => $value,)+
                    $name::Other(other) => other,
                }
            }
        }
    };
}

/// Seconds since 2004-01-01 00:00:00 UTC
pub type Time32 = u32;

/// Microseconds since 2004-01-01 00:00:00 UTC
pub type Time64 = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct Time64WithStandardDeviation {
    pub time: Time64,
    /// Logarithm (base 1.134666) of the standard deviation in nanoseconds
    pub log_std_dev: u8,
}

/// The low-order eight bytes of a SHA-256 digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct HashedId8(pub [u8; 8]);

/// The low-order three bytes of a SHA-256 digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct HashedId3(pub [u8; 3]);

impl From<HashedId8> for HashedId3 {
    fn from(value: HashedId8) -> Self {
        Self([value.0[5], value.0[6], value.0[7]])
    }
}

/// Unsigned integer of variable width, serialized with the
/// length coding of [`length`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct IntX(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct TwoDLocation {
    /// Latitude in 1/10 micro degrees
    pub latitude: i32,
    /// Longitude in 1/10 micro degrees
    pub longitude: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct ThreeDLocation {
    pub latitude: i32,
    pub longitude: i32,
    /// Elevation as defined by the two-byte encoding of TS 103 097
    pub elevation: [u8; 2],
}

byte_enum! {
    pub enum DurationUnit {
        Seconds = 0,
        Minutes = 1,
        Hours = 2,
        SixtyHourBlocks = 3,
        Years = 4,
    }
}

/// Duration with a 3-bit unit and a 13-bit value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct Duration(pub u16);

impl Duration {
    const VALUE_MASK: u16 = 0x1fff;

    /// Returns `None` if `value` exceeds 13 bits or `unit` 3 bits.
    #[must_use]
    pub fn new(unit: DurationUnit, value: u16) -> Option<Self> {
        let unit = u8::from(unit);
        if value > Self::VALUE_MASK || unit > 7 {
            return None;
        }
        Some(Self((u16::from(unit) << 13) | value))
    }

    #[must_use]
    pub fn unit(&self) -> DurationUnit {
        DurationUnit::from((self.0 >> 13) as u8)
    }

    #[must_use]
    pub fn value(&self) -> u16 {
        self.0 & Self::VALUE_MASK
    }

    /// Length of this duration in seconds, `None` for reserved units
    #[must_use]
    pub fn to_seconds(&self) -> Option<u64> {
        let factor = match self.unit() {
            DurationUnit::Seconds => 1,
            DurationUnit::Minutes => 60,
            DurationUnit::Hours => 3_600,
            DurationUnit::SixtyHourBlocks => 216_000,
            DurationUnit::Years => 31_556_925,
            DurationUnit::Other(_) => return None,
        };
        Some(u64::from(self.value()) * factor)
    }
}

byte_enum! {
    pub enum PublicKeyAlgorithm {
        EcdsaNistP256WithSha256 = 0,
        EciesNistP256 = 1,
    }
}

byte_enum! {
    pub enum SymmetricAlgorithm {
        Aes128Ccm = 0,
    }
}

/// Point on the NIST P-256 curve
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub enum EccPoint {
    XCoordinateOnly([u8; 32]),
    CompressedLsbY0([u8; 32]),
    CompressedLsbY1([u8; 32]),
    Uncompressed { x: [u8; 32], y: [u8; 32] },
    Unknown { point_type: u8, data: Vec<u8> },
}

impl EccPoint {
    #[must_use]
    pub fn point_type(&self) -> u8 {
        match self {
            EccPoint::XCoordinateOnly(_) => 0,
            EccPoint::CompressedLsbY0(_) => 2,
            EccPoint::CompressedLsbY1(_) => 3,
            EccPoint::Uncompressed { .. } => 4,
            EccPoint::Unknown { point_type, .. } => *point_type,
        }
    }

    /// Returns the x coordinate if the point type carries one.
    #[must_use]
    pub fn x(&self) -> Option<&[u8; 32]> {
        match self {
            EccPoint::XCoordinateOnly(x)
            | EccPoint::CompressedLsbY0(x)
            | EccPoint::CompressedLsbY1(x)
            | EccPoint::Uncompressed { x, .. } => Some(x),
            EccPoint::Unknown { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub enum PublicKey {
    EcdsaNistP256(EccPoint),
    EciesNistP256 {
        supported_symmetric_algorithm: SymmetricAlgorithm,
        public_key: EccPoint,
    },
    Unknown { algorithm: u8, data: Vec<u8> },
}

impl PublicKey {
    #[must_use]
    pub fn algorithm(&self) -> PublicKeyAlgorithm {
        match self {
            PublicKey::EcdsaNistP256(_) => PublicKeyAlgorithm::EcdsaNistP256WithSha256,
            PublicKey::EciesNistP256 { .. } => PublicKeyAlgorithm::EciesNistP256,
            PublicKey::Unknown { algorithm, .. } => PublicKeyAlgorithm::from(*algorithm),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct EcdsaSignature {
    pub r: EccPoint,
    pub s: [u8; 32],
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub enum Signature {
    EcdsaNistP256(EcdsaSignature),
    Unknown { algorithm: u8, data: Vec<u8> },
}

impl Signature {
    #[must_use]
    pub fn algorithm(&self) -> PublicKeyAlgorithm {
        match self {
            Signature::EcdsaNistP256(_) => PublicKeyAlgorithm::EcdsaNistP256WithSha256,
            Signature::Unknown { algorithm, .. } => PublicKeyAlgorithm::from(*algorithm),
        }
    }
}

/// Field of an extensible list whose type identifier has no registered
/// codec. The body is kept verbatim so that re-encoding is byte-exact.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct UnknownField {
    pub type_id: u8,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct AlgorithmDigest {
    pub algorithm: PublicKeyAlgorithm,
    pub digest: HashedId8,
}

/// Describes who vouches for a signature.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub enum SignerInfo {
    /// Verified against the key of the certificate itself
    SelfSigned,
    CertificateDigestWithSha256(HashedId8),
    Certificate(Box<Certificate>),
    /// Ordered chain, starting with the signing certificate
    CertificateChain(Vec<Certificate>),
    CertificateDigestWithOtherAlgorithm(AlgorithmDigest),
    Unknown(UnknownField),
}

byte_enum! {
    pub enum SubjectType {
        EnrollmentCredential = 0,
        AuthorizationTicket = 1,
        AuthorizationAuthority = 2,
        EnrollmentAuthority = 3,
        RootCa = 4,
        CrlSigner = 5,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct SubjectInfo {
    pub subject_type: SubjectType,
    pub subject_name: Vec<u8>,
}

/// Assurance level (upper three bits) and confidence (lower two bits)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct SubjectAssurance(pub u8);

impl SubjectAssurance {
    #[must_use]
    pub fn assurance(&self) -> u8 {
        self.0 >> 5
    }

    #[must_use]
    pub fn confidence(&self) -> u8 {
        self.0 & 0b11
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct ItsAidSsp {
    pub its_aid: IntX,
    pub service_specific_permissions: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub enum SubjectAttribute {
    VerificationKey(PublicKey),
    EncryptionKey(PublicKey),
    AssuranceLevel(SubjectAssurance),
    ReconstructionValue(EccPoint),
    ItsAidList(Vec<IntX>),
    ItsAidSspList(Vec<ItsAidSsp>),
    Unknown(UnknownField),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct TimeStartAndEnd {
    pub start: Time32,
    pub end: Time32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct TimeStartAndDuration {
    pub start: Time32,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct CircularRegion {
    pub center: TwoDLocation,
    /// Radius in metres
    pub radius: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct RectangularRegion {
    pub northwest: TwoDLocation,
    pub southeast: TwoDLocation,
}

byte_enum! {
    pub enum RegionDictionary {
        Iso3166_1 = 0,
        UnStats = 1,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct IdentifiedRegion {
    pub region_dictionary: RegionDictionary,
    pub region_identifier: u16,
    pub local_region: IntX,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub enum GeographicRegion {
    None,
    Circle(CircularRegion),
    Rectangle(Vec<RectangularRegion>),
    Polygon(Vec<TwoDLocation>),
    Identified(IdentifiedRegion),
    Unknown { region_type: u8, data: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub enum ValidityRestriction {
    TimeEnd(Time32),
    TimeStartAndEnd(TimeStartAndEnd),
    TimeStartAndDuration(TimeStartAndDuration),
    Region(GeographicRegion),
    Unknown(UnknownField),
}

/// Certificate of an ITS station or authority.
///
/// Version 1 certificates frame the signer info as a length-prefixed list
/// holding exactly one entry, version 2 certificates carry it unframed.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct Certificate {
    pub version: u8,
    pub signer_info: SignerInfo,
    pub subject_info: SubjectInfo,
    pub subject_attributes: Vec<SubjectAttribute>,
    pub validity_restrictions: Vec<ValidityRestriction>,
    /// Issuer's signature over every preceding byte of the certificate
    pub signature: Signature,
}

impl Certificate {
    #[must_use]
    pub fn subject_type(&self) -> SubjectType {
        self.subject_info.subject_type
    }

    #[must_use]
    pub fn is_self_signed(&self) -> bool {
        matches!(self.signer_info, SignerInfo::SelfSigned)
    }

    /// Digest of the issuing certificate, if the signer info refers to it by digest
    #[must_use]
    pub fn issuer_digest(&self) -> Option<HashedId8> {
        match &self.signer_info {
            SignerInfo::CertificateDigestWithSha256(digest) => Some(*digest),
            SignerInfo::CertificateDigestWithOtherAlgorithm(other) => Some(other.digest),
            _ => None,
        }
    }

    #[must_use]
    pub fn verification_key(&self) -> Option<&PublicKey> {
        self.subject_attributes.iter().find_map(|attribute| match attribute {
            SubjectAttribute::VerificationKey(key) => Some(key),
            _ => None,
        })
    }

    #[must_use]
    pub fn encryption_key(&self) -> Option<&PublicKey> {
        self.subject_attributes.iter().find_map(|attribute| match attribute {
            SubjectAttribute::EncryptionKey(key) => Some(key),
            _ => None,
        })
    }

    #[must_use]
    pub fn assurance_level(&self) -> Option<SubjectAssurance> {
        self.subject_attributes.iter().find_map(|attribute| match attribute {
            SubjectAttribute::AssuranceLevel(level) => Some(*level),
            _ => None,
        })
    }

    /// Returns the validity window as `(start, end)` if the certificate
    /// restricts its validity in time.
    #[must_use]
    pub fn validity_period(&self) -> Option<(Option<Time32>, Time32)> {
        self.validity_restrictions
            .iter()
            .find_map(|restriction| match restriction {
                ValidityRestriction::TimeEnd(end) => Some((None, *end)),
                ValidityRestriction::TimeStartAndEnd(TimeStartAndEnd { start, end }) => {
                    Some((Some(*start), *end))
                }
                ValidityRestriction::TimeStartAndDuration(TimeStartAndDuration {
                    start,
                    duration,
                }) => duration
                    .to_seconds()
                    .and_then(|seconds| u32::try_from(seconds).ok())
                    .map(|seconds| (Some(*start), start.saturating_add(seconds))),
                _ => None,
            })
    }

    #[must_use]
    pub fn region(&self) -> Option<&GeographicRegion> {
        self.validity_restrictions
            .iter()
            .find_map(|restriction| match restriction {
                ValidityRestriction::Region(region) => Some(region),
                _ => None,
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub enum EncryptionParameters {
    Aes128Ccm { nonce: [u8; 12] },
    Unknown { symmetric_algorithm: u8, data: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct EciesEncryptedKey {
    pub v: EccPoint,
    /// AES-128 key encrypted for the recipient
    pub c: [u8; 16],
    pub t: [u8; 16],
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub enum EncryptedKey {
    EciesNistP256(EciesEncryptedKey),
    Unknown { algorithm: u8, data: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct RecipientInfo {
    pub cert_id: HashedId8,
    pub encrypted_key: EncryptedKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HeaderFieldType {
    GenerationTime = 0,
    GenerationTimeConfidence = 1,
    Expiration = 2,
    GenerationLocation = 3,
    RequestUnrecognizedCertificate = 4,
    MessageType = 5,
    SignerInfo = 128,
    EncryptionParameters = 129,
    RecipientInfo = 130,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub enum HeaderField {
    GenerationTime(Time64),
    GenerationTimeConfidence(Time64WithStandardDeviation),
    Expiration(Time32),
    GenerationLocation(ThreeDLocation),
    RequestUnrecognizedCertificate(Vec<HashedId3>),
    MessageType(u16),
    SignerInfo(SignerInfo),
    EncryptionParameters(EncryptionParameters),
    RecipientInfo(Vec<RecipientInfo>),
    Unknown(UnknownField),
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub enum TrailerField {
    Signature(Signature),
    Unknown(UnknownField),
}

byte_enum! {
    pub enum PayloadType {
        Unsecured = 0,
        Signed = 1,
        Encrypted = 2,
        /// The payload is not part of the message, only its type is transmitted
        SignedExternal = 3,
        SignedAndEncrypted = 4,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct Payload {
    pub payload_type: PayloadType,
    pub data: Vec<u8>,
}

impl Payload {
    #[must_use]
    pub fn new(payload_type: PayloadType, data: impl Into<Vec<u8>>) -> Self {
        Self {
            payload_type,
            data: data.into(),
        }
    }
}

/// Secured message according to ETSI TS 103 097 v1.2.1
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct SecuredMessage {
    pub protocol_version: u8,
    pub header_fields: Vec<HeaderField>,
    pub payload: Payload,
    pub trailer_fields: Vec<TrailerField>,
}

impl SecuredMessage {
    /// Creates an empty message of the current protocol version.
    #[must_use]
    pub fn new(payload: Payload) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            header_fields: Vec::new(),
            payload,
            trailer_fields: Vec::new(),
        }
    }

    /// Returns the first header field of the given type.
    #[must_use]
    pub fn header_field(&self, field_type: HeaderFieldType) -> Option<&HeaderField> {
        self.header_fields
            .iter()
            .find(|field| field.field_type() == field_type as u8)
    }

    #[must_use]
    pub fn signer_info(&self) -> Option<&SignerInfo> {
        self.header_fields.iter().find_map(|field| match field {
            HeaderField::SignerInfo(signer) => Some(signer),
            _ => None,
        })
    }

    #[must_use]
    pub fn generation_time(&self) -> Option<Time64> {
        self.header_fields.iter().find_map(|field| match field {
            HeaderField::GenerationTime(time) => Some(*time),
            HeaderField::GenerationTimeConfidence(confident) => Some(confident.time),
            _ => None,
        })
    }

    #[must_use]
    pub fn message_type(&self) -> Option<u16> {
        self.header_fields.iter().find_map(|field| match field {
            HeaderField::MessageType(message_type) => Some(*message_type),
            _ => None,
        })
    }

    /// Returns the first signature trailer field.
    #[must_use]
    pub fn signature(&self) -> Option<&Signature> {
        self.trailer_fields.iter().find_map(|field| match field {
            TrailerField::Signature(signature) => Some(signature),
            TrailerField::Unknown(_) => None,
        })
    }
}
