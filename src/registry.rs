//! Lookup tables mapping the type identifier of an extensible field to the
//! routines decoding and encoding its body.
//!
//! Header and trailer fields are selected by the protocol version of the
//! enclosing message, certificate sub-structures share one table per
//! category. All tables are immutable statics and may be used from any
//! number of threads at once.
//!
//! Identifiers without an entry are either kept as [`UnknownField`] or
//! rejected, depending on [`UnknownFieldPolicy`](crate::UnknownFieldPolicy).
extern crate alloc;

use alloc::boxed::Box;
use core::fmt::Display;

use crate::{
    archive::{failure, read_opaque, read_u8},
    decode::{Cause, DecodeContext, IResult, InternalDecode},
    Certificate, Encode, EncodeError, Encoder, HeaderField, SignerInfo, SubjectAttribute,
    TrailerField, UnknownField, UnknownFieldPolicy, ValidityRestriction,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldCategory {
    Header,
    Trailer,
    SignerInfo,
    SubjectAttribute,
    ValidityRestriction,
}

impl Display for FieldCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            FieldCategory::Header => "header",
            FieldCategory::Trailer => "trailer",
            FieldCategory::SignerInfo => "signer info",
            FieldCategory::SubjectAttribute => "subject attribute",
            FieldCategory::ValidityRestriction => "validity restriction",
        })
    }
}

/// Sum type whose variants are selected by a one-byte type identifier
pub trait TaggedField: Sized + 'static {
    fn field_type(&self) -> u8;

    fn from_unknown(field: UnknownField) -> Self;

    fn as_unknown(&self) -> Option<&UnknownField>;
}

pub(crate) type DecodeBody<F> = for<'a> fn(&'a [u8], DecodeContext) -> IResult<&'a [u8], F>;
pub(crate) type EncodeBody<F> = fn(&F, &mut Encoder) -> Result<(), EncodeError>;

pub(crate) struct FieldCodec<F: 'static> {
    type_id: u8,
    name: &'static str,
    decode: DecodeBody<F>,
    encode: EncodeBody<F>,
}

pub struct FieldRegistry<F: 'static> {
    category: FieldCategory,
    codecs: &'static [FieldCodec<F>],
}

impl<F: TaggedField> FieldRegistry<F> {
    #[must_use]
    pub fn category(&self) -> FieldCategory {
        self.category
    }

    /// Returns the name of the field registered for `type_id`.
    #[must_use]
    pub fn name_of(&self, type_id: u8) -> Option<&'static str> {
        self.lookup(type_id).map(|codec| codec.name)
    }

    #[must_use]
    pub fn contains(&self, type_id: u8) -> bool {
        self.lookup(type_id).is_some()
    }

    pub fn type_ids(&self) -> impl Iterator<Item = u8> + '_ {
        self.codecs.iter().map(|codec| codec.type_id)
    }

    fn lookup(&self, type_id: u8) -> Option<&FieldCodec<F>> {
        self.codecs.iter().find(|codec| codec.type_id == type_id)
    }

    pub(crate) fn decode_field<'a>(&self, input: &'a [u8], ctx: DecodeContext) -> IResult<&'a [u8], F> {
        let (body, type_id) = read_u8(input)?;
        if let Some(codec) = self.lookup(type_id) {
            log::trace!("Decoding {} field {}", self.category, codec.name);
            return (codec.decode)(body, ctx);
        }
        match ctx.unknown_fields {
            UnknownFieldPolicy::Preserve => {
                let (rest, raw) = read_opaque(body)?;
                log::debug!(
                    "Preserving unknown {} field of type {type_id} ({} bytes)",
                    self.category,
                    raw.len()
                );
                Ok((
                    rest,
                    F::from_unknown(UnknownField {
                        type_id,
                        body: raw.to_vec(),
                    }),
                ))
            }
            UnknownFieldPolicy::Reject => {
                log::debug!("Rejecting unknown {} field of type {type_id}", self.category);
                Err(failure(
                    input,
                    Cause::UnknownField {
                        category: self.category,
                        type_id,
                    },
                ))
            }
        }
    }

    pub(crate) fn encode_field(&self, field: &F, output: &mut Encoder) -> Result<(), EncodeError> {
        let type_id = field.field_type();
        match (field.as_unknown(), self.lookup(type_id)) {
            (Some(unknown), None) => {
                output.write_int(type_id);
                output.write_opaque(&unknown.body)
            }
            (None, Some(codec)) => {
                output.write_int(type_id);
                (codec.encode)(field, output)
            }
            (Some(_), Some(codec)) => Err(EncodeError::EncodingInvariantViolation(alloc::format!(
                "Unknown {} field uses type {type_id}, which is registered for {}!",
                self.category,
                codec.name
            ))),
            (None, None) => Err(EncodeError::EncodingInvariantViolation(alloc::format!(
                "No codec registered for {} field type {type_id}!",
                self.category
            ))),
        }
    }
}

fn mismatch(name: &str, type_id: u8) -> EncodeError {
    EncodeError::EncodingInvariantViolation(alloc::format!(
        "Codec {name} cannot encode a field of type {type_id}!"
    ))
}

macro_rules! codec {
    ($field:ident::$variant:ident, $type_id:expr, $name:literal) => {
        FieldCodec {
            type_id: $type_id,
            name: $name,
            decode: |input, _| Ok((input, $field::$variant)),
            encode: |field, _| match field {
                $field::$variant => Ok(()),
                other => Err(mismatch($name, other.field_type())),
            },
        }
    };
    ($field:ident::$variant:ident($body:ty), $type_id:expr, $name:literal) => {
        FieldCodec {
            type_id: $type_id,
            name: $name,
            decode: |input, ctx| {
                let (input, body) = <$body as InternalDecode>::decode_bytewise(input, ctx)?;
                Ok((input, $field::$variant(body)))
            },
            encode: |field, output| match field {
                $field::$variant(body) => body.encode(output),
                other => Err(mismatch($name, other.field_type())),
            },
        }
    };
}

macro_rules! tagged_field {
    ($field:ident { $($variant:ident $(($binding:pat))? => $type_id:expr,)+ }) => {
        impl TaggedField for $field {
            fn field_type(&self) -> u8 {
                match self {
                    $($field::$variant $(($binding))? => $type_id,)+
                    $field::Unknown(unknown) => unknown.type_id,
                }
            }

            fn from_unknown(field: UnknownField) -> Self {
                $field::Unknown(field)
            }

            fn as_unknown(&self) -> Option<&UnknownField> {
                match self {
                    $field::Unknown(unknown) => Some(unknown),
                    _ => None,
                }
            }
        }
    };
}

tagged_field!(HeaderField {
    GenerationTime(_) => 0,
    GenerationTimeConfidence(_) => 1,
    Expiration(_) => 2,
    GenerationLocation(_) => 3,
    RequestUnrecognizedCertificate(_) => 4,
    MessageType(_) => 5,
    SignerInfo(_) => 128,
    EncryptionParameters(_) => 129,
    RecipientInfo(_) => 130,
});

tagged_field!(TrailerField {
    Signature(_) => 1,
});

tagged_field!(SignerInfo {
    SelfSigned => 0,
    CertificateDigestWithSha256(_) => 1,
    Certificate(_) => 2,
    CertificateChain(_) => 3,
    CertificateDigestWithOtherAlgorithm(_) => 4,
});

tagged_field!(SubjectAttribute {
    VerificationKey(_) => 0,
    EncryptionKey(_) => 1,
    AssuranceLevel(_) => 2,
    ReconstructionValue(_) => 3,
    ItsAidList(_) => 32,
    ItsAidSspList(_) => 33,
});

tagged_field!(ValidityRestriction {
    TimeEnd(_) => 0,
    TimeStartAndEnd(_) => 1,
    TimeStartAndDuration(_) => 2,
    Region(_) => 3,
});

static HEADER_CODECS_V2: [FieldCodec<HeaderField>; 9] = [
    codec!(HeaderField::GenerationTime(u64), 0, "generation_time"),
    codec!(
        HeaderField::GenerationTimeConfidence(crate::Time64WithStandardDeviation),
        1,
        "generation_time_confidence"
    ),
    codec!(HeaderField::Expiration(u32), 2, "expiration"),
    codec!(
        HeaderField::GenerationLocation(crate::ThreeDLocation),
        3,
        "generation_location"
    ),
    codec!(
        HeaderField::RequestUnrecognizedCertificate(alloc::vec::Vec<crate::HashedId3>),
        4,
        "request_unrecognized_certificate"
    ),
    codec!(HeaderField::MessageType(u16), 5, "message_type"),
    codec!(HeaderField::SignerInfo(SignerInfo), 128, "signer_info"),
    codec!(
        HeaderField::EncryptionParameters(crate::EncryptionParameters),
        129,
        "encryption_parameters"
    ),
    codec!(
        HeaderField::RecipientInfo(alloc::vec::Vec<crate::RecipientInfo>),
        130,
        "recipient_info"
    ),
];

static TRAILER_CODECS_V2: [FieldCodec<TrailerField>; 1] = [codec!(
    TrailerField::Signature(crate::Signature),
    1,
    "signature"
)];

static SIGNER_INFO_CODECS: [FieldCodec<SignerInfo>; 5] = [
    codec!(SignerInfo::SelfSigned, 0, "self"),
    codec!(
        SignerInfo::CertificateDigestWithSha256(crate::HashedId8),
        1,
        "certificate_digest_with_sha256"
    ),
    FieldCodec {
        type_id: 2,
        name: "certificate",
        decode: |input, ctx| {
            let nested = ctx.enter_certificate(input)?;
            let (input, certificate) = Certificate::decode_bytewise(input, nested)?;
            Ok((input, SignerInfo::Certificate(Box::new(certificate))))
        },
        encode: |field, output| match field {
            SignerInfo::Certificate(certificate) => certificate.encode(output),
            other => Err(mismatch("certificate", other.field_type())),
        },
    },
    FieldCodec {
        type_id: 3,
        name: "certificate_chain",
        decode: |input, ctx| {
            let nested = ctx.enter_certificate(input)?;
            let (input, chain) =
                <alloc::vec::Vec<Certificate> as InternalDecode>::decode_bytewise(input, nested)?;
            Ok((input, SignerInfo::CertificateChain(chain)))
        },
        encode: |field, output| match field {
            SignerInfo::CertificateChain(chain) => chain.encode(output),
            other => Err(mismatch("certificate_chain", other.field_type())),
        },
    },
    codec!(
        SignerInfo::CertificateDigestWithOtherAlgorithm(crate::AlgorithmDigest),
        4,
        "certificate_digest_with_other_algorithm"
    ),
];

static SUBJECT_ATTRIBUTE_CODECS: [FieldCodec<SubjectAttribute>; 6] = [
    codec!(SubjectAttribute::VerificationKey(crate::PublicKey), 0, "verification_key"),
    codec!(SubjectAttribute::EncryptionKey(crate::PublicKey), 1, "encryption_key"),
    codec!(
        SubjectAttribute::AssuranceLevel(crate::SubjectAssurance),
        2,
        "assurance_level"
    ),
    codec!(
        SubjectAttribute::ReconstructionValue(crate::EccPoint),
        3,
        "reconstruction_value"
    ),
    codec!(
        SubjectAttribute::ItsAidList(alloc::vec::Vec<crate::IntX>),
        32,
        "its_aid_list"
    ),
    codec!(
        SubjectAttribute::ItsAidSspList(alloc::vec::Vec<crate::ItsAidSsp>),
        33,
        "its_aid_ssp_list"
    ),
];

static VALIDITY_RESTRICTION_CODECS: [FieldCodec<ValidityRestriction>; 4] = [
    codec!(ValidityRestriction::TimeEnd(u32), 0, "time_end"),
    codec!(
        ValidityRestriction::TimeStartAndEnd(crate::TimeStartAndEnd),
        1,
        "time_start_and_end"
    ),
    codec!(
        ValidityRestriction::TimeStartAndDuration(crate::TimeStartAndDuration),
        2,
        "time_start_and_duration"
    ),
    codec!(
        ValidityRestriction::Region(crate::GeographicRegion),
        3,
        "region"
    ),
];

static HEADER_FIELDS_V2: FieldRegistry<HeaderField> = FieldRegistry {
    category: FieldCategory::Header,
    codecs: &HEADER_CODECS_V2,
};

static TRAILER_FIELDS_V2: FieldRegistry<TrailerField> = FieldRegistry {
    category: FieldCategory::Trailer,
    codecs: &TRAILER_CODECS_V2,
};

pub static SIGNER_INFO: FieldRegistry<SignerInfo> = FieldRegistry {
    category: FieldCategory::SignerInfo,
    codecs: &SIGNER_INFO_CODECS,
};

pub static SUBJECT_ATTRIBUTES: FieldRegistry<SubjectAttribute> = FieldRegistry {
    category: FieldCategory::SubjectAttribute,
    codecs: &SUBJECT_ATTRIBUTE_CODECS,
};

pub static VALIDITY_RESTRICTIONS: FieldRegistry<ValidityRestriction> = FieldRegistry {
    category: FieldCategory::ValidityRestriction,
    codecs: &VALIDITY_RESTRICTION_CODECS,
};

/// Header field table of the given secured message protocol version
#[must_use]
pub fn header_fields(protocol_version: u8) -> Option<&'static FieldRegistry<HeaderField>> {
    match protocol_version {
        2 => Some(&HEADER_FIELDS_V2),
        _ => None,
    }
}

/// Trailer field table of the given secured message protocol version
#[must_use]
pub fn trailer_fields(protocol_version: u8) -> Option<&'static FieldRegistry<TrailerField>> {
    match protocol_version {
        2 => Some(&TRAILER_FIELDS_V2),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode::DecodeContext, DecodeOptions};

    #[test]
    fn registries_cover_every_known_variant() {
        let headers = header_fields(2).unwrap();
        assert_eq!(
            headers.type_ids().collect::<alloc::vec::Vec<_>>(),
            [0, 1, 2, 3, 4, 5, 128, 129, 130]
        );
        assert_eq!(headers.name_of(5), Some("message_type"));
        assert!(trailer_fields(2).unwrap().contains(1));
        assert!(header_fields(1).is_none());
        assert!(trailer_fields(3).is_none());
        assert_eq!(SIGNER_INFO.category(), FieldCategory::SignerInfo);
        assert_eq!(SUBJECT_ATTRIBUTES.name_of(33), Some("its_aid_ssp_list"));
        assert!(!VALIDITY_RESTRICTIONS.contains(4));
    }

    #[test]
    fn decodes_registered_and_unknown_fields() {
        let ctx = DecodeContext::new(&DecodeOptions::default());
        let (rest, field) = VALIDITY_RESTRICTIONS
            .decode_field(&[0x00, 0x10, 0xec, 0x21, 0x01, 0xff], ctx)
            .unwrap();
        assert_eq!(field, ValidityRestriction::TimeEnd(0x10ec_2101));
        assert_eq!(rest, [0xff]);

        let (rest, field) = VALIDITY_RESTRICTIONS
            .decode_field(&[0x07, 0x02, 0xab, 0xcd], ctx)
            .unwrap();
        assert_eq!(
            field,
            ValidityRestriction::Unknown(UnknownField {
                type_id: 7,
                body: alloc::vec![0xab, 0xcd]
            })
        );
        assert!(rest.is_empty());
    }

    #[test]
    fn rejects_unknown_fields_when_strict() {
        let ctx = DecodeContext::new(&DecodeOptions::strict());
        match SUBJECT_ATTRIBUTES.decode_field(&[0x07, 0x00], ctx) {
            Err(nom::Err::Failure(e)) => assert_eq!(
                e.cause,
                Cause::UnknownField {
                    category: FieldCategory::SubjectAttribute,
                    type_id: 7
                }
            ),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn refuses_unknown_fields_shadowing_registered_types() {
        let mut output = Encoder::new();
        let field = HeaderField::Unknown(UnknownField {
            type_id: 5,
            body: alloc::vec![0x00, 0x02],
        });
        assert!(matches!(
            header_fields(2).unwrap().encode_field(&field, &mut output),
            Err(EncodeError::EncodingInvariantViolation(_))
        ));
    }
}
