extern crate alloc;

use alloc::vec::Vec;
use core::fmt::{Debug, Display};

use nom::{
    combinator::map,
    error::{ErrorKind, ParseError},
    sequence::tuple,
};
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::{
    archive::{failure, read_array, read_i32, read_opaque, read_u16, read_u32, read_u64, read_u8},
    length,
    registry::{self, FieldCategory},
    *,
};

/// Depth of certificates embedded in signer infos accepted by default
pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 8;

/// Upper bound of [`DecodeOptions::max_chain_depth`], larger settings are clamped
pub const MAX_CHAIN_DEPTH_LIMIT: usize = 32;

/// Returns the value of a decoding attempt
#[derive(Debug, PartialEq)]
pub struct Decoded<T: Debug + PartialEq> {
    /// indicates the number of bytes that were consumed by the decoder
    pub bytes_consumed: usize,
    /// the decoded return value
    pub decoded: T,
}

/// Treatment of extensible fields whose type identifier has no registered codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub enum UnknownFieldPolicy {
    /// Keep the raw body as [`UnknownField`]
    #[default]
    Preserve,
    /// Fail with [`Cause::UnknownField`]
    Reject,
}

/// Settings of a decoding run.
///
/// The options can be loaded from JSON with the `json` feature, missing
/// keys take their default value:
/// ```rust
/// # use its_security::*;
/// let options: DecodeOptions = serde_json::from_str(r#"{"unknown_fields":"Reject"}"#).unwrap();
/// assert_eq!(options, DecodeOptions::strict());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize), serde(default))]
pub struct DecodeOptions {
    pub unknown_fields: UnknownFieldPolicy,
    /// Number of certificates that may be nested inside each other's signer info,
    /// at most [`MAX_CHAIN_DEPTH_LIMIT`]
    pub max_chain_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            unknown_fields: UnknownFieldPolicy::Preserve,
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
        }
    }
}

impl DecodeOptions {
    /// Options rejecting every unknown field
    #[must_use]
    pub fn strict() -> Self {
        Self {
            unknown_fields: UnknownFieldPolicy::Reject,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_unknown_fields(mut self, policy: UnknownFieldPolicy) -> Self {
        self.unknown_fields = policy;
        self
    }

    /// Sets the nesting limit, clamped to [`MAX_CHAIN_DEPTH_LIMIT`].
    #[must_use]
    pub fn with_max_chain_depth(mut self, depth: usize) -> Self {
        self.max_chain_depth = depth.min(MAX_CHAIN_DEPTH_LIMIT);
        self
    }
}

pub trait Decode: Sized + Debug + PartialEq {
    /// Decodes a value from the start of `input` using default options.
    ///
    /// The `Decode` trait is implemented for the top-level structures of
    /// ETSI TS 103 097 v1.2.1:
    ///  - `SecuredMessage`
    ///  - `Certificate`
    ///
    /// Bytes following the value are not consumed. Use `from_bytes` to
    /// require that the value spans the whole input.
    /// ### Usage
    /// ```rust
    /// # use its_security::*;
    /// let data: &'static [u8] = &[
    ///   0x02, 0x05, 0x05, 0x00, 0x02, 0x80, 0x00, 0x01, 0x01, 0x2a, 0x00,
    /// ];
    /// let result = SecuredMessage::decode(data).unwrap();
    /// assert_eq!(result.bytes_consumed, 11);
    /// assert_eq!(result.decoded.message_type(), Some(2));
    /// ```
    fn decode(input: &[u8]) -> Result<Decoded<Self>, DecodeError> {
        Self::decode_with(input, &DecodeOptions::default())
    }

    fn decode_with(input: &[u8], options: &DecodeOptions) -> Result<Decoded<Self>, DecodeError>;
}

/// Structure a parse failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Structure {
    SecuredMessage,
    Certificate,
}

fn decode_top<T: InternalDecode + Debug + PartialEq>(
    input: &[u8],
    options: &DecodeOptions,
    structure: Structure,
) -> Result<Decoded<T>, DecodeError> {
    log::trace!("Decoding {structure:?} from {} bytes", input.len());
    match T::decode_bytewise(input, DecodeContext::new(options)) {
        Ok((remaining, decoded)) => Ok(Decoded {
            bytes_consumed: input.len() - remaining.len(),
            decoded,
        }),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
            let error = DecodeError::from_failure(input.len(), e, structure);
            log::debug!("Failed to decode {structure:?}: {error}");
            Err(error)
        }
        Err(nom::Err::Incomplete(_)) => Err(DecodeError::from_failure(
            input.len(),
            ParseFailure::new(
                &[],
                Cause::UnexpectedEndOfInput {
                    needed: 1,
                    available: 0,
                },
            ),
            structure,
        )),
    }
}

fn decode_exact<T: Decode>(input: &[u8], structure: Structure) -> Result<T, DecodeError> {
    let Decoded {
        bytes_consumed,
        decoded,
    } = T::decode(input)?;
    if bytes_consumed < input.len() {
        let cause = Cause::TrailingBytes(input.len() - bytes_consumed);
        return Err(match structure {
            Structure::SecuredMessage => DecodeError::MalformedSecuredMessage {
                offset: bytes_consumed,
                cause,
            },
            Structure::Certificate => DecodeError::MalformedCertificate {
                offset: bytes_consumed,
                cause,
            },
        });
    }
    Ok(decoded)
}

macro_rules! decode {
    ($typ:ident) => {
        impl Decode for $typ {
            fn decode_with(
                input: &[u8],
                options: &DecodeOptions,
            ) -> Result<Decoded<Self>, DecodeError> {
                decode_top::<$typ>(input, options, Structure::$typ)
            }
        }

        impl $typ {
            /// Decodes a value that has to span the whole of `input`.
            pub fn from_bytes(input: &[u8]) -> Result<Self, DecodeError> {
                decode_exact(input, Structure::$typ)
            }

            #[cfg(feature = "json")]
            /// Tries to deserialize a value from its JSON representation.
            pub fn from_json(json: &str) -> Result<Self, DecodeError> {
                serde_json::from_str(json).map_err(|e| DecodeError::Json(alloc::format!("{e:?}")))
            }
        }
    };
}

decode!(SecuredMessage);
decode!(Certificate);

/// Reason a byte sequence could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cause {
    UnexpectedEndOfInput { needed: usize, available: usize },
    /// A length prefix announces more bytes than remain in the input
    TruncatedLength { declared: u64, available: usize },
    NonCanonicalLength,
    /// A length prefix would need more than eight bytes
    UnsupportedLengthWidth,
    UnsupportedProtocolVersion(u8),
    UnsupportedCertificateVersion(u8),
    UnknownField { category: FieldCategory, type_id: u8 },
    InvalidValue(&'static str),
    /// An element of a list ends beyond the list's declared length
    FieldOverrun,
    TrailingBytes(usize),
    ChainDepthExceeded { limit: usize },
    Parser(ErrorKind),
}

impl Display for Cause {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Cause::UnexpectedEndOfInput { needed, available } => write!(
                f,
                "Unexpected end of input: needed {needed} bytes, {available} available"
            ),
            Cause::TruncatedLength {
                declared,
                available,
            } => write!(
                f,
                "Declared length {declared} exceeds the {available} remaining bytes"
            ),
            Cause::NonCanonicalLength => f.write_str("Length is not encoded in its shortest form"),
            Cause::UnsupportedLengthWidth => f.write_str("Length prefix is wider than 8 bytes"),
            Cause::UnsupportedProtocolVersion(version) => {
                write!(f, "Unsupported protocol version {version}")
            }
            Cause::UnsupportedCertificateVersion(version) => {
                write!(f, "Unsupported certificate version {version}")
            }
            Cause::UnknownField { category, type_id } => {
                write!(f, "Unknown {category} field of type {type_id}")
            }
            Cause::InvalidValue(reason) => f.write_str(reason),
            Cause::FieldOverrun => f.write_str("Field exceeds the length of its enclosing list"),
            Cause::TrailingBytes(count) => write!(f, "{count} bytes left after the end of input"),
            Cause::ChainDepthExceeded { limit } => {
                write!(f, "Certificates nested deeper than {limit} levels")
            }
            Cause::Parser(kind) => write!(f, "Parser error {kind:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    MalformedSecuredMessage { offset: usize, cause: Cause },
    MalformedCertificate { offset: usize, cause: Cause },
    ChainDepthExceeded { offset: usize, limit: usize },
    #[cfg(feature = "json")]
    Json(alloc::string::String),
}

impl DecodeError {
    fn from_failure(input_len: usize, failure: ParseFailure, default: Structure) -> Self {
        let offset = input_len.saturating_sub(failure.remaining);
        match (failure.cause, failure.structure.unwrap_or(default)) {
            (Cause::ChainDepthExceeded { limit }, _) => Self::ChainDepthExceeded { offset, limit },
            (cause, Structure::SecuredMessage) => Self::MalformedSecuredMessage { offset, cause },
            (cause, Structure::Certificate) => Self::MalformedCertificate { offset, cause },
        }
    }

    /// Position of the failure, counted from the start of the decoded input
    #[must_use]
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::MalformedSecuredMessage { offset, .. }
            | Self::MalformedCertificate { offset, .. }
            | Self::ChainDepthExceeded { offset, .. } => Some(*offset),
            #[cfg(feature = "json")]
            Self::Json(_) => None,
        }
    }

    #[must_use]
    pub fn cause(&self) -> Option<&Cause> {
        match self {
            Self::MalformedSecuredMessage { cause, .. } | Self::MalformedCertificate { cause, .. } => {
                Some(cause)
            }
            _ => None,
        }
    }

    /// Whether decoding failed because the input ended too early
    #[must_use]
    pub fn is_truncation(&self) -> bool {
        matches!(
            self.cause(),
            Some(Cause::UnexpectedEndOfInput { .. } | Cause::TruncatedLength { .. })
        )
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DecodeError::MalformedSecuredMessage { offset, cause } => {
                write!(f, "Malformed secured message at byte {offset}: {cause}")
            }
            DecodeError::MalformedCertificate { offset, cause } => {
                write!(f, "Malformed certificate at byte {offset}: {cause}")
            }
            DecodeError::ChainDepthExceeded { offset, limit } => write!(
                f,
                "Certificate at byte {offset} exceeds the maximum chain depth of {limit}"
            ),
            #[cfg(feature = "json")]
            DecodeError::Json(e) => write!(f, "JSON error: {e}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

/// Error state threaded through the parsers.
///
/// Holds the number of bytes left when parsing stopped, so that the offset
/// can be computed relative to the outermost input.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParseFailure {
    pub(crate) remaining: usize,
    pub(crate) cause: Cause,
    pub(crate) structure: Option<Structure>,
}

impl ParseFailure {
    pub(crate) fn new(input: &[u8], cause: Cause) -> Self {
        Self {
            remaining: input.len(),
            cause,
            structure: None,
        }
    }

    /// Attributes the failure to `structure` unless a nested structure
    /// already claimed it.
    fn within(mut self, structure: Structure) -> Self {
        if self.structure.is_none() {
            self.structure = Some(structure);
        }
        self
    }
}

impl<'a> ParseError<&'a [u8]> for ParseFailure {
    fn from_error_kind(input: &'a [u8], kind: ErrorKind) -> Self {
        ParseFailure::new(input, Cause::Parser(kind))
    }

    fn append(_: &'a [u8], _: ErrorKind, other: Self) -> Self {
        other
    }
}

pub(crate) type IResult<I, T> = nom::IResult<I, T, ParseFailure>;

/// State handed down through nested parsers
#[derive(Debug, Clone, Copy)]
pub(crate) struct DecodeContext {
    pub(crate) unknown_fields: UnknownFieldPolicy,
    max_chain_depth: usize,
    depth: usize,
}

impl DecodeContext {
    pub(crate) fn new(options: &DecodeOptions) -> Self {
        Self {
            unknown_fields: options.unknown_fields,
            max_chain_depth: options.max_chain_depth.min(MAX_CHAIN_DEPTH_LIMIT),
            depth: 0,
        }
    }

    /// Context for a certificate embedded at `input`.
    pub(crate) fn enter_certificate(self, input: &[u8]) -> Result<Self, nom::Err<ParseFailure>> {
        if self.depth >= self.max_chain_depth {
            return Err(failure(
                input,
                Cause::ChainDepthExceeded {
                    limit: self.max_chain_depth,
                },
            ));
        }
        Ok(Self {
            depth: self.depth + 1,
            ..self
        })
    }
}

pub(crate) trait InternalDecode: Sized {
    fn decode_bytewise(input: &[u8], ctx: DecodeContext) -> IResult<&[u8], Self>;
}

/// Types that appear as elements of length-prefixed lists
pub(crate) trait ListElement {}

macro_rules! list_element {
    ($($typ:ty),+) => {
        $(impl ListElement for $typ {})+
    };
}

list_element!(
    HashedId3,
    IntX,
    TwoDLocation,
    RectangularRegion,
    ItsAidSsp,
    RecipientInfo,
    SignerInfo,
    SubjectAttribute,
    ValidityRestriction,
    Certificate
);

/// Parses elements until exactly the number of bytes announced by the
/// length prefix is consumed.
pub(crate) fn length_prefixed_list<'a, T, F>(
    input: &'a [u8],
    mut element: F,
) -> IResult<&'a [u8], Vec<T>>
where
    F: FnMut(&'a [u8]) -> IResult<&'a [u8], T>,
{
    let (mut input, length) = length::read_buffer_length(input)?;
    let end = input.len() - length;
    let mut elements = Vec::new();
    while input.len() > end {
        let (rest, decoded) = element(input)?;
        if rest.len() < end {
            return Err(failure(rest, Cause::FieldOverrun));
        }
        input = rest;
        elements.push(decoded);
    }
    Ok((input, elements))
}

impl<T: InternalDecode + ListElement> InternalDecode for Vec<T> {
    fn decode_bytewise(input: &[u8], ctx: DecodeContext) -> IResult<&[u8], Self> {
        length_prefixed_list(input, |i| T::decode_bytewise(i, ctx))
    }
}

macro_rules! impl_decodable {
    ($typ:ty, $parser:expr) => {
        impl InternalDecode for $typ {
            fn decode_bytewise(input: &[u8], _: DecodeContext) -> IResult<&[u8], Self> {
                $parser(input)
            }
        }
    };
}

impl_decodable!(u8, read_u8);
impl_decodable!(u16, read_u16);
impl_decodable!(u32, read_u32);
impl_decodable!(u64, read_u64);
impl_decodable!(HashedId8, map(read_array::<8>, HashedId8));
impl_decodable!(HashedId3, map(read_array::<3>, HashedId3));
impl_decodable!(IntX, map(length::read_length, IntX));
impl_decodable!(Duration, map(read_u16, Duration));
impl_decodable!(SubjectAssurance, map(read_u8, SubjectAssurance));
impl_decodable!(
    Time64WithStandardDeviation,
    map(tuple((read_u64, read_u8)), |(time, log_std_dev)| {
        Time64WithStandardDeviation { time, log_std_dev }
    })
);
impl_decodable!(
    TwoDLocation,
    map(tuple((read_i32, read_i32)), |(latitude, longitude)| {
        TwoDLocation {
            latitude,
            longitude,
        }
    })
);
impl_decodable!(
    ThreeDLocation,
    map(
        tuple((read_i32, read_i32, read_array::<2>)),
        |(latitude, longitude, elevation)| ThreeDLocation {
            latitude,
            longitude,
            elevation,
        }
    )
);
impl_decodable!(
    TimeStartAndEnd,
    map(tuple((read_u32, read_u32)), |(start, end)| TimeStartAndEnd {
        start,
        end
    })
);
impl_decodable!(
    TimeStartAndDuration,
    map(tuple((read_u32, read_u16)), |(start, duration)| {
        TimeStartAndDuration {
            start,
            duration: Duration(duration),
        }
    })
);

impl InternalDecode for EccPoint {
    fn decode_bytewise(input: &[u8], _: DecodeContext) -> IResult<&[u8], Self> {
        let (input, point_type) = read_u8(input)?;
        match point_type {
            0 => map(read_array::<32>, EccPoint::XCoordinateOnly)(input),
            2 => map(read_array::<32>, EccPoint::CompressedLsbY0)(input),
            3 => map(read_array::<32>, EccPoint::CompressedLsbY1)(input),
            4 => {
                let (input, (x, y)) = tuple((read_array::<32>, read_array::<32>))(input)?;
                Ok((input, EccPoint::Uncompressed { x, y }))
            }
            point_type => {
                let (input, data) = read_opaque(input)?;
                Ok((
                    input,
                    EccPoint::Unknown {
                        point_type,
                        data: data.to_vec(),
                    },
                ))
            }
        }
    }
}

impl InternalDecode for PublicKey {
    fn decode_bytewise(input: &[u8], ctx: DecodeContext) -> IResult<&[u8], Self> {
        let (input, algorithm) = read_u8(input)?;
        match PublicKeyAlgorithm::from(algorithm) {
            PublicKeyAlgorithm::EcdsaNistP256WithSha256 => {
                let (input, point) = EccPoint::decode_bytewise(input, ctx)?;
                Ok((input, PublicKey::EcdsaNistP256(point)))
            }
            PublicKeyAlgorithm::EciesNistP256 => {
                let (input, symmetric) = read_u8(input)?;
                let (input, public_key) = EccPoint::decode_bytewise(input, ctx)?;
                Ok((
                    input,
                    PublicKey::EciesNistP256 {
                        supported_symmetric_algorithm: SymmetricAlgorithm::from(symmetric),
                        public_key,
                    },
                ))
            }
            PublicKeyAlgorithm::Other(algorithm) => {
                let (input, data) = read_opaque(input)?;
                Ok((
                    input,
                    PublicKey::Unknown {
                        algorithm,
                        data: data.to_vec(),
                    },
                ))
            }
        }
    }
}

impl InternalDecode for Signature {
    fn decode_bytewise(input: &[u8], ctx: DecodeContext) -> IResult<&[u8], Self> {
        let (input, algorithm) = read_u8(input)?;
        match PublicKeyAlgorithm::from(algorithm) {
            PublicKeyAlgorithm::EcdsaNistP256WithSha256 => {
                let (input, r) = EccPoint::decode_bytewise(input, ctx)?;
                let (input, s) = read_array::<32>(input)?;
                Ok((input, Signature::EcdsaNistP256(EcdsaSignature { r, s })))
            }
            _ => {
                let (input, data) = read_opaque(input)?;
                Ok((
                    input,
                    Signature::Unknown {
                        algorithm,
                        data: data.to_vec(),
                    },
                ))
            }
        }
    }
}

impl InternalDecode for AlgorithmDigest {
    fn decode_bytewise(input: &[u8], ctx: DecodeContext) -> IResult<&[u8], Self> {
        let (input, algorithm) = read_u8(input)?;
        let (input, digest) = HashedId8::decode_bytewise(input, ctx)?;
        Ok((
            input,
            AlgorithmDigest {
                algorithm: PublicKeyAlgorithm::from(algorithm),
                digest,
            },
        ))
    }
}

impl InternalDecode for SubjectInfo {
    fn decode_bytewise(input: &[u8], _: DecodeContext) -> IResult<&[u8], Self> {
        let (input, subject_type) = read_u8(input)?;
        let (input, subject_name) = read_opaque(input)?;
        Ok((
            input,
            SubjectInfo {
                subject_type: SubjectType::from(subject_type),
                subject_name: subject_name.to_vec(),
            },
        ))
    }
}

impl InternalDecode for ItsAidSsp {
    fn decode_bytewise(input: &[u8], ctx: DecodeContext) -> IResult<&[u8], Self> {
        let (input, its_aid) = IntX::decode_bytewise(input, ctx)?;
        let (input, permissions) = read_opaque(input)?;
        Ok((
            input,
            ItsAidSsp {
                its_aid,
                service_specific_permissions: permissions.to_vec(),
            },
        ))
    }
}

impl InternalDecode for CircularRegion {
    fn decode_bytewise(input: &[u8], ctx: DecodeContext) -> IResult<&[u8], Self> {
        let (input, center) = TwoDLocation::decode_bytewise(input, ctx)?;
        let (input, radius) = read_u16(input)?;
        Ok((input, CircularRegion { center, radius }))
    }
}

impl InternalDecode for RectangularRegion {
    fn decode_bytewise(input: &[u8], ctx: DecodeContext) -> IResult<&[u8], Self> {
        let (input, northwest) = TwoDLocation::decode_bytewise(input, ctx)?;
        let (input, southeast) = TwoDLocation::decode_bytewise(input, ctx)?;
        Ok((
            input,
            RectangularRegion {
                northwest,
                southeast,
            },
        ))
    }
}

impl InternalDecode for IdentifiedRegion {
    fn decode_bytewise(input: &[u8], ctx: DecodeContext) -> IResult<&[u8], Self> {
        let (input, (region_dictionary, region_identifier)) = tuple((read_u8, read_u16))(input)?;
        let (input, local_region) = IntX::decode_bytewise(input, ctx)?;
        Ok((
            input,
            IdentifiedRegion {
                region_dictionary: RegionDictionary::from(region_dictionary),
                region_identifier,
                local_region,
            },
        ))
    }
}

impl InternalDecode for GeographicRegion {
    fn decode_bytewise(input: &[u8], ctx: DecodeContext) -> IResult<&[u8], Self> {
        let (input, region_type) = read_u8(input)?;
        match region_type {
            0 => Ok((input, GeographicRegion::None)),
            1 => {
                let (input, circle) = CircularRegion::decode_bytewise(input, ctx)?;
                Ok((input, GeographicRegion::Circle(circle)))
            }
            2 => {
                let (input, rectangles) = Vec::<RectangularRegion>::decode_bytewise(input, ctx)?;
                Ok((input, GeographicRegion::Rectangle(rectangles)))
            }
            3 => {
                let (input, points) = Vec::<TwoDLocation>::decode_bytewise(input, ctx)?;
                Ok((input, GeographicRegion::Polygon(points)))
            }
            4 => {
                let (input, identified) = IdentifiedRegion::decode_bytewise(input, ctx)?;
                Ok((input, GeographicRegion::Identified(identified)))
            }
            region_type => {
                let (input, data) = read_opaque(input)?;
                Ok((
                    input,
                    GeographicRegion::Unknown {
                        region_type,
                        data: data.to_vec(),
                    },
                ))
            }
        }
    }
}

impl InternalDecode for EncryptionParameters {
    fn decode_bytewise(input: &[u8], _: DecodeContext) -> IResult<&[u8], Self> {
        let (input, symmetric_algorithm) = read_u8(input)?;
        match SymmetricAlgorithm::from(symmetric_algorithm) {
            SymmetricAlgorithm::Aes128Ccm => {
                map(read_array::<12>, |nonce| EncryptionParameters::Aes128Ccm {
                    nonce,
                })(input)
            }
            SymmetricAlgorithm::Other(symmetric_algorithm) => {
                let (input, data) = read_opaque(input)?;
                Ok((
                    input,
                    EncryptionParameters::Unknown {
                        symmetric_algorithm,
                        data: data.to_vec(),
                    },
                ))
            }
        }
    }
}

impl InternalDecode for RecipientInfo {
    fn decode_bytewise(input: &[u8], ctx: DecodeContext) -> IResult<&[u8], Self> {
        let (input, cert_id) = HashedId8::decode_bytewise(input, ctx)?;
        let (input, algorithm) = read_u8(input)?;
        let (input, encrypted_key) = match PublicKeyAlgorithm::from(algorithm) {
            PublicKeyAlgorithm::EciesNistP256 => {
                let (input, v) = EccPoint::decode_bytewise(input, ctx)?;
                let (input, (c, t)) = tuple((read_array::<16>, read_array::<16>))(input)?;
                (input, EncryptedKey::EciesNistP256(EciesEncryptedKey { v, c, t }))
            }
            _ => {
                let (input, data) = read_opaque(input)?;
                (
                    input,
                    EncryptedKey::Unknown {
                        algorithm,
                        data: data.to_vec(),
                    },
                )
            }
        };
        Ok((
            input,
            RecipientInfo {
                cert_id,
                encrypted_key,
            },
        ))
    }
}

impl InternalDecode for Payload {
    fn decode_bytewise(input: &[u8], _: DecodeContext) -> IResult<&[u8], Self> {
        let (input, payload_type) = read_u8(input)?;
        let payload_type = PayloadType::from(payload_type);
        if payload_type == PayloadType::SignedExternal {
            return Ok((input, Payload::new(payload_type, Vec::new())));
        }
        let (input, data) = read_opaque(input)?;
        Ok((input, Payload::new(payload_type, data)))
    }
}

impl InternalDecode for SignerInfo {
    fn decode_bytewise(input: &[u8], ctx: DecodeContext) -> IResult<&[u8], Self> {
        registry::SIGNER_INFO.decode_field(input, ctx)
    }
}

impl InternalDecode for SubjectAttribute {
    fn decode_bytewise(input: &[u8], ctx: DecodeContext) -> IResult<&[u8], Self> {
        registry::SUBJECT_ATTRIBUTES.decode_field(input, ctx)
    }
}

impl InternalDecode for ValidityRestriction {
    fn decode_bytewise(input: &[u8], ctx: DecodeContext) -> IResult<&[u8], Self> {
        registry::VALIDITY_RESTRICTIONS.decode_field(input, ctx)
    }
}

fn decode_certificate(input: &[u8], ctx: DecodeContext) -> IResult<&[u8], Certificate> {
    let (rest, version) = read_u8(input)?;
    let (rest, signer_info) = match version {
        1 => {
            let (after, mut signers) = Vec::<SignerInfo>::decode_bytewise(rest, ctx)?;
            match (signers.pop(), signers.is_empty()) {
                (Some(signer), true) => (after, signer),
                _ => {
                    return Err(failure(
                        rest,
                        Cause::InvalidValue("Version 1 certificates carry exactly one signer info"),
                    ))
                }
            }
        }
        2 => SignerInfo::decode_bytewise(rest, ctx)?,
        version => return Err(failure(input, Cause::UnsupportedCertificateVersion(version))),
    };
    let (rest, subject_info) = SubjectInfo::decode_bytewise(rest, ctx)?;
    let (rest, subject_attributes) = Vec::<SubjectAttribute>::decode_bytewise(rest, ctx)?;
    let (rest, validity_restrictions) = Vec::<ValidityRestriction>::decode_bytewise(rest, ctx)?;
    let (rest, signature) = Signature::decode_bytewise(rest, ctx)?;
    Ok((
        rest,
        Certificate {
            version,
            signer_info,
            subject_info,
            subject_attributes,
            validity_restrictions,
            signature,
        },
    ))
}

impl InternalDecode for Certificate {
    fn decode_bytewise(input: &[u8], ctx: DecodeContext) -> IResult<&[u8], Self> {
        decode_certificate(input, ctx).map_err(|e| e.map(|f| f.within(Structure::Certificate)))
    }
}

fn decode_secured_message(input: &[u8], ctx: DecodeContext) -> IResult<&[u8], SecuredMessage> {
    let (rest, protocol_version) = read_u8(input)?;
    let (Some(headers), Some(trailers)) = (
        registry::header_fields(protocol_version),
        registry::trailer_fields(protocol_version),
    ) else {
        return Err(failure(
            input,
            Cause::UnsupportedProtocolVersion(protocol_version),
        ));
    };
    let (rest, header_fields) = length_prefixed_list(rest, |i| headers.decode_field(i, ctx))?;
    let (rest, payload) = Payload::decode_bytewise(rest, ctx)?;
    let (rest, trailer_fields) = length_prefixed_list(rest, |i| trailers.decode_field(i, ctx))?;
    Ok((
        rest,
        SecuredMessage {
            protocol_version,
            header_fields,
            payload,
            trailer_fields,
        },
    ))
}

impl InternalDecode for SecuredMessage {
    fn decode_bytewise(input: &[u8], ctx: DecodeContext) -> IResult<&[u8], Self> {
        decode_secured_message(input, ctx)
            .map_err(|e| e.map(|f| f.within(Structure::SecuredMessage)))
    }
}
