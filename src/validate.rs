use std::{borrow::Cow, collections::BTreeMap, fmt::Display};

use ecdsa::signature::{Signer as _, Verifier as _};
use p256::{
    ecdsa::{Signature as P256Signature, SigningKey, VerifyingKey},
    FieldBytes,
};
use sha2::{Digest, Sha256};

use crate::{
    resolve_signer, Certificate, CertificateStore, EcdsaSignature, EccPoint, Encode, EncodeError,
    HashedId8, HeaderField, PublicKey, SecuredMessage, Signature, Signer,
    UnresolvedSignerReference, Verifier, DEFAULT_MAX_CHAIN_DEPTH, PROTOCOL_VERSION,
};

pub trait Validate {
    ///  The `Validate` trait exposes a `validate` method that checks whether the implementing type is valid.
    /// `validate` runs the following checks:
    /// - The signature of a certificate matches the verification key of its issuer,
    ///   up to a self-signed root certificate
    /// - The signature of a secured message matches the verification key of its signer certificate
    /// - The header fields of a signed message conform to ETSI TS 103 097 v1.2.1
    ///
    /// Certificates referenced by digest are looked up in `store`.
    /// Whether the root certificate is trusted is left to the caller.
    /// #### Returns
    /// - `Ok(ValidationResult::Success)` if all checks passed successful
    /// - `Ok(ValidationResult::Failure { reason: String })` if a check failed
    /// - `Ok(ValidationResult::NotApplicable { info: &'static str })` if no validation checks were run
    /// - `Err(ValidationError)` if an internal error occured during validation
    fn validate<S: CertificateStore + ?Sized>(
        &self,
        store: &S,
    ) -> Result<ValidationResult, ValidationError>;
}

#[derive(Debug, PartialEq)]
pub enum ValidationResult {
    Success,
    Failure { reason: String },
    NotApplicable { info: &'static str },
}

#[derive(Debug, PartialEq)]
pub enum ValidationError {
    InvalidInput(String),
    Unsupported(String),
    ReencodingError(String),
    UnresolvedSignerReference(UnresolvedSignerReference),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidInput(message) => write!(f, "Invalid input: {message}"),
            ValidationError::Unsupported(message) => write!(f, "Unsupported: {message}"),
            ValidationError::ReencodingError(message) => write!(f, "Re-encoding failed: {message}"),
            ValidationError::UnresolvedSignerReference(reference) => reference.fmt(f),
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<EncodeError> for ValidationError {
    fn from(value: EncodeError) -> Self {
        ValidationError::ReencodingError(value.message().into())
    }
}

impl From<UnresolvedSignerReference> for ValidationError {
    fn from(value: UnresolvedSignerReference) -> Self {
        ValidationError::UnresolvedSignerReference(value)
    }
}

macro_rules! validate_and_continue {
    ($result:expr) => {
        match $result {
            ValidationResult::Success => (),
            ValidationResult::NotApplicable { .. } => (),
            failure => return Ok(failure),
        }
    };
}

impl Validate for SecuredMessage {
    fn validate<S: CertificateStore + ?Sized>(
        &self,
        store: &S,
    ) -> Result<ValidationResult, ValidationError> {
        if self.protocol_version != PROTOCOL_VERSION {
            return Ok(ValidationResult::Failure {
                reason: format!(
                    "Protocol version of secured messages must be {PROTOCOL_VERSION}. Found {}",
                    self.protocol_version
                ),
            });
        }
        let Some(signature) = self.signature() else {
            return Ok(ValidationResult::NotApplicable {
                info: "Secured messages without signature are not validated.",
            });
        };
        validate_and_continue!(check_header_fields(&self.header_fields));

        let Some(HeaderField::SignerInfo(signer_info)) = self.header_fields.first() else {
            return Ok(ValidationResult::Failure {
                reason: "Signer info must be the first header field!".into(),
            });
        };
        let signer = resolve_signer(signer_info, store)?;
        let Some(certificate) = signer.certificate() else {
            return Ok(ValidationResult::Failure {
                reason: "Violates ETSI TS 103 097: Signer info of messages must not be self!"
                    .into(),
            });
        };
        validate_and_continue!(certificate.validate(store)?);
        verify_with(certificate, &self.signing_bytes()?, signature)
    }
}

fn check_header_fields(header_fields: &[HeaderField]) -> ValidationResult {
    if !matches!(header_fields.first(), Some(HeaderField::SignerInfo(_))) {
        return ValidationResult::Failure {
            reason: "Signer info must be the first header field!".into(),
        };
    }
    let mut generation_time = None;
    let mut expiration = None;
    for field in header_fields {
        match field {
            HeaderField::GenerationTime(time) => generation_time = Some(*time),
            HeaderField::GenerationTimeConfidence(confident) => {
                generation_time = Some(confident.time)
            }
            HeaderField::Expiration(time) => expiration = Some(*time),
            _ => (),
        }
    }
    match (generation_time, expiration) {
        (None, _) => ValidationResult::Failure {
            reason: "Generation time must be present!".into(),
        },
        // generation time counts microseconds, expiration seconds
        (Some(generated), Some(expires)) if u64::from(expires) * 1_000_000 < generated => {
            ValidationResult::Failure {
                reason: "Expiry timestamp is older than generation timestamp.".into(),
            }
        }
        _ => ValidationResult::Success,
    }
}

fn check_certificate(certificate: &Certificate) -> ValidationResult {
    if certificate.verification_key().is_none() {
        return ValidationResult::Failure {
            reason: "Certificate must contain a verification key!".into(),
        };
    }
    match certificate.validity_period() {
        Some((Some(start), end)) if start > end => ValidationResult::Failure {
            reason: format!("Certificate validity starts at {start}, after its end at {end}."),
        },
        _ => ValidationResult::Success,
    }
}

impl Validate for Certificate {
    fn validate<S: CertificateStore + ?Sized>(
        &self,
        store: &S,
    ) -> Result<ValidationResult, ValidationError> {
        let mut current = Cow::Borrowed(self);
        for _ in 0..=DEFAULT_MAX_CHAIN_DEPTH {
            validate_and_continue!(check_certificate(&current));
            let issuer = resolve_signer(&current.signer_info, store)?.into_certificate();
            let key_holder = issuer.as_ref().unwrap_or(&*current);
            validate_and_continue!(verify_with(
                key_holder,
                &current.to_be_signed_bytes()?,
                &current.signature
            )?);
            match issuer {
                Some(issuer) => current = Cow::Owned(issuer),
                None => return Ok(ValidationResult::Success),
            }
        }
        Ok(ValidationResult::Failure {
            reason: format!(
                "Certificate chain exceeds {DEFAULT_MAX_CHAIN_DEPTH} issuers without reaching a self-signed certificate!"
            ),
        })
    }
}

fn verify_with(
    signer: &Certificate,
    data: &[u8],
    signature: &Signature,
) -> Result<ValidationResult, ValidationError> {
    let Some(key) = signer.verification_key() else {
        return Ok(ValidationResult::Failure {
            reason: "Signer certificate must contain a verification key!".into(),
        });
    };
    if EcdsaNistP256::verifier().verify(data, signature, key)? {
        Ok(ValidationResult::Success)
    } else {
        Ok(ValidationResult::Failure {
            reason: format!(
                "Signature does not match the verification key of {:?} certificate {:?}",
                signer.subject_type(),
                String::from_utf8_lossy(&signer.subject_info.subject_name)
            ),
        })
    }
}

fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

impl Certificate {
    /// Returns the identifier other structures use to refer to this certificate.
    ///
    /// The digest covers the encoded certificate with the `r` value of an
    /// ECDSA signature reduced to its x coordinate.
    pub fn digest(&self) -> Result<HashedId8, EncodeError> {
        let mut canonical = self.clone();
        if let Signature::EcdsaNistP256(signature) = &mut canonical.signature {
            if let Some(x) = signature.r.x().copied() {
                signature.r = EccPoint::XCoordinateOnly(x);
            }
        }
        let hash = sha256(&canonical.encode_to_vec()?);
        let mut digest = [0; 8];
        digest.copy_from_slice(&hash[hash.len() - 8..]);
        Ok(HashedId8(digest))
    }
}

/// ECDSA over NIST P-256 with SHA-256
#[derive(Debug, Clone, Default)]
pub struct EcdsaNistP256 {
    signing_key: Option<SigningKey>,
}

impl EcdsaNistP256 {
    /// Provider that can only verify signatures
    #[must_use]
    pub fn verifier() -> Self {
        Self::default()
    }

    /// Provider signing with the given big-endian secret scalar
    pub fn from_secret_key(secret: &[u8]) -> Result<Self, ValidationError> {
        SigningKey::from_slice(secret)
            .map(|key| Self {
                signing_key: Some(key),
            })
            .map_err(|e| ValidationError::InvalidInput(format!("{e:?}")))
    }

    /// Verification key matching the secret key, in uncompressed form
    #[must_use]
    pub fn public_key(&self) -> Option<PublicKey> {
        let point = self
            .signing_key
            .as_ref()?
            .verifying_key()
            .to_encoded_point(false);
        let (mut x, mut y) = ([0u8; 32], [0u8; 32]);
        x.copy_from_slice(point.x()?);
        y.copy_from_slice(point.y()?);
        Some(PublicKey::EcdsaNistP256(EccPoint::Uncompressed { x, y }))
    }
}

fn verifying_key(point: &EccPoint) -> Result<VerifyingKey, ValidationError> {
    let sec1 = match point {
        EccPoint::CompressedLsbY0(x) => [&[0x02u8][..], &x[..]].concat(),
        EccPoint::CompressedLsbY1(x) => [&[0x03u8][..], &x[..]].concat(),
        EccPoint::Uncompressed { x, y } => [&[0x04u8][..], &x[..], &y[..]].concat(),
        _ => {
            return Err(ValidationError::InvalidInput(
                "Verifying key must be indicated in compressed-y, or uncompressed form!".into(),
            ))
        }
    };
    VerifyingKey::from_sec1_bytes(&sec1).map_err(|e| ValidationError::InvalidInput(format!("{e:?}")))
}

impl Verifier for EcdsaNistP256 {
    type Error = ValidationError;

    fn verify(
        &self,
        data: &[u8],
        signature: &Signature,
        key: &PublicKey,
    ) -> Result<bool, ValidationError> {
        let (Signature::EcdsaNistP256(EcdsaSignature { r, s }), PublicKey::EcdsaNistP256(point)) =
            (signature, key)
        else {
            return Err(ValidationError::Unsupported(format!(
                "Signature algorithm {:?} with verification key algorithm {:?}",
                signature.algorithm(),
                key.algorithm()
            )));
        };
        let Some(r) = r.x() else {
            return Err(ValidationError::InvalidInput(
                "R value of signature is not given!".into(),
            ));
        };
        let Ok(signature) = P256Signature::from_scalars(FieldBytes::from(*r), FieldBytes::from(*s))
        else {
            return Ok(false);
        };
        Ok(verifying_key(point)?.verify(data, &signature).is_ok())
    }
}

impl Signer for EcdsaNistP256 {
    type Error = ValidationError;

    fn sign(&self, data: &[u8]) -> Result<Signature, ValidationError> {
        let key = self.signing_key.as_ref().ok_or_else(|| {
            ValidationError::InvalidInput("Provider holds no signing key!".into())
        })?;
        let signature: P256Signature = key.sign(data);
        let (r, s) = signature.split_bytes();
        let (mut x, mut s_bytes) = ([0u8; 32], [0u8; 32]);
        x.copy_from_slice(&r);
        s_bytes.copy_from_slice(&s);
        Ok(Signature::EcdsaNistP256(EcdsaSignature {
            r: EccPoint::XCoordinateOnly(x),
            s: s_bytes,
        }))
    }
}

/// Certificate store held in memory, keyed by certificate digest
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    certificates: BTreeMap<HashedId8, Certificate>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `certificate` and returns its digest.
    pub fn insert(&mut self, certificate: Certificate) -> Result<HashedId8, EncodeError> {
        let digest = certificate.digest()?;
        log::debug!("Storing certificate {digest:?}");
        self.certificates.insert(digest, certificate);
        Ok(digest)
    }

    #[must_use]
    pub fn get(&self, digest: &HashedId8) -> Option<&Certificate> {
        self.certificates.get(digest)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }
}

impl CertificateStore for MemoryStore {
    fn lookup(&self, digest: &HashedId8) -> Option<Certificate> {
        self.get(digest).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_vectors::*, Payload, PayloadType, SignerInfo, SubjectAttribute, SubjectInfo,
        SubjectType, TimeStartAndEnd, ValidityRestriction,
    };

    fn digest(bytes: [u8; 8]) -> HashedId8 {
        HashedId8(bytes)
    }

    fn certificate(vector: &str) -> Certificate {
        Certificate::from_bytes(&bytes(vector)).unwrap()
    }

    fn pki_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert(certificate(ROOT_CERTIFICATE)).unwrap();
        store.insert(certificate(AA1_CERTIFICATE)).unwrap();
        store
    }

    fn unsigned_certificate(
        subject_type: SubjectType,
        signer_info: SignerInfo,
        key: PublicKey,
    ) -> Certificate {
        Certificate {
            version: 2,
            signer_info,
            subject_info: SubjectInfo {
                subject_type,
                subject_name: b"test".to_vec(),
            },
            subject_attributes: vec![SubjectAttribute::VerificationKey(key)],
            validity_restrictions: vec![ValidityRestriction::TimeStartAndEnd(TimeStartAndEnd {
                start: 0x05a4_ec01,
                end: 0x10ec_2101,
            })],
            signature: Signature::Unknown {
                algorithm: 0xff,
                data: vec![],
            },
        }
    }

    #[test]
    fn computes_certificate_digests() {
        let expected = [
            (ROOT_CERTIFICATE, [0x83, 0xca, 0x21, 0x68, 0xb7, 0x84, 0xfc, 0x6c]),
            (AA1_CERTIFICATE, [0xa8, 0xed, 0x6d, 0xf6, 0x5b, 0x0e, 0x6d, 0x6a]),
            (EA_CERTIFICATE, [0x9d, 0x99, 0x74, 0xe5, 0x5f, 0x47, 0xfe, 0xbe]),
            (AA2_CERTIFICATE, [0x0e, 0xc6, 0xe5, 0x1b, 0x5a, 0x7a, 0x72, 0x2a]),
            (AA3_CERTIFICATE, [0x75, 0xb9, 0x49, 0x65, 0x6e, 0x69, 0x01, 0xe6]),
        ];
        for (vector, id) in expected {
            assert_eq!(certificate(vector).digest(), Ok(digest(id)));
        }
        assert_eq!(
            certificate(AA1_CERTIFICATE).issuer_digest(),
            Some(digest(expected[0].1))
        );
        assert_eq!(certificate(EA_CERTIFICATE).issuer_digest(), None);
    }

    #[test]
    fn validates_pki_certificates() {
        let empty = MemoryStore::new();
        for vector in [ROOT_CERTIFICATE, EA_CERTIFICATE, AA3_CERTIFICATE] {
            assert_eq!(
                certificate(vector).validate(&empty),
                Ok(ValidationResult::Success)
            );
        }
        assert_eq!(
            certificate(AA1_CERTIFICATE).validate(&empty),
            Err(ValidationError::UnresolvedSignerReference(
                UnresolvedSignerReference::UnknownDigest {
                    digest: digest([0x83, 0xca, 0x21, 0x68, 0xb7, 0x84, 0xfc, 0x6c])
                }
            ))
        );
        let store = pki_store();
        assert_eq!(store.len(), 2);
        for vector in [AA1_CERTIFICATE, AA2_CERTIFICATE] {
            assert_eq!(
                certificate(vector).validate(&store),
                Ok(ValidationResult::Success)
            );
        }
    }

    #[test]
    fn validates_authorization_tickets_of_messages() {
        let store = pki_store();
        for vector in [MESSAGE_1, MESSAGE_2, MESSAGE_3] {
            let message = SecuredMessage::from_bytes(&bytes(vector)).unwrap();
            let Some(SignerInfo::Certificate(ticket)) = message.signer_info() else {
                panic!("expected an embedded authorization ticket");
            };
            assert_eq!(ticket.validate(&store), Ok(ValidationResult::Success));
        }
    }

    #[test]
    fn sample_message_signatures_predate_version_2() {
        let message = SecuredMessage::from_bytes(&bytes(MESSAGE_3)).unwrap();
        assert!(matches!(
            message.validate(&pki_store()),
            Ok(ValidationResult::Failure { .. })
        ));
    }

    #[test]
    fn detects_tampered_certificate() {
        let mut root = certificate(ROOT_CERTIFICATE);
        root.subject_info.subject_name = b"PilotPKI_Toor".to_vec();
        assert!(matches!(
            root.validate(&MemoryStore::new()),
            Ok(ValidationResult::Failure { .. })
        ));
    }

    #[test]
    fn signs_and_validates_message() {
        let root_key = EcdsaNistP256::from_secret_key(&[0x11; 32]).unwrap();
        let ticket_key = EcdsaNistP256::from_secret_key(&[0x22; 32]).unwrap();

        let mut root = unsigned_certificate(
            SubjectType::RootCa,
            SignerInfo::SelfSigned,
            root_key.public_key().unwrap(),
        );
        root.sign_with(&root_key).unwrap();
        let mut store = MemoryStore::new();
        let root_digest = store.insert(root).unwrap();

        let mut ticket = unsigned_certificate(
            SubjectType::AuthorizationTicket,
            SignerInfo::CertificateDigestWithSha256(root_digest),
            ticket_key.public_key().unwrap(),
        );
        ticket.sign_with(&root_key).unwrap();

        let mut message = SecuredMessage::new(Payload::new(PayloadType::Signed, *b"hello"));
        message.header_fields = vec![
            HeaderField::SignerInfo(SignerInfo::Certificate(Box::new(ticket))),
            HeaderField::GenerationTime(162_124_598_663_000),
            HeaderField::MessageType(2),
        ];
        message.sign_with(&ticket_key).unwrap();

        let received = SecuredMessage::from_bytes(&message.encode_to_vec().unwrap()).unwrap();
        assert_eq!(received.validate(&store), Ok(ValidationResult::Success));

        let mut tampered = received.clone();
        tampered.payload.data[0] ^= 1;
        assert!(matches!(
            tampered.validate(&store),
            Ok(ValidationResult::Failure { .. })
        ));
    }

    #[test]
    fn checks_message_headers() {
        let mut message = SecuredMessage::from_bytes(&bytes(MESSAGE_1)).unwrap();
        message.header_fields.retain(|field| !matches!(field, HeaderField::GenerationTime(_)));
        assert_eq!(
            message.validate(&pki_store()),
            Ok(ValidationResult::Failure {
                reason: "Generation time must be present!".into()
            })
        );

        let mut message = SecuredMessage::from_bytes(&bytes(MESSAGE_1)).unwrap();
        message.header_fields.rotate_left(1);
        assert_eq!(
            message.validate(&pki_store()),
            Ok(ValidationResult::Failure {
                reason: "Signer info must be the first header field!".into()
            })
        );

        let mut message = SecuredMessage::from_bytes(&bytes(MESSAGE_1)).unwrap();
        message.header_fields.push(HeaderField::Expiration(1));
        assert_eq!(
            message.validate(&pki_store()),
            Ok(ValidationResult::Failure {
                reason: "Expiry timestamp is older than generation timestamp.".into()
            })
        );

        message.trailer_fields.clear();
        assert!(matches!(
            message.validate(&pki_store()),
            Ok(ValidationResult::NotApplicable { .. })
        ));
    }

    #[test]
    fn verifies_with_compressed_keys() {
        let provider = EcdsaNistP256::from_secret_key(&[0x33; 32]).unwrap();
        let Some(PublicKey::EcdsaNistP256(EccPoint::Uncompressed { x, y })) = provider.public_key()
        else {
            panic!("expected an uncompressed key");
        };
        let compressed = PublicKey::EcdsaNistP256(if y[31] & 1 == 0 {
            EccPoint::CompressedLsbY0(x)
        } else {
            EccPoint::CompressedLsbY1(x)
        });
        let signature = provider.sign(b"payload").unwrap();
        assert_eq!(provider.verify(b"payload", &signature, &compressed), Ok(true));
        assert_eq!(provider.verify(b"Payload", &signature, &compressed), Ok(false));
        assert!(provider
            .verify(b"payload", &signature, &PublicKey::EcdsaNistP256(EccPoint::XCoordinateOnly(x)))
            .is_err());
    }

    #[test]
    fn verifier_cannot_sign() {
        assert!(matches!(
            EcdsaNistP256::verifier().sign(b"data"),
            Err(ValidationError::InvalidInput(_))
        ));
        assert!(EcdsaNistP256::from_secret_key(&[0; 32]).is_err());
    }
}
