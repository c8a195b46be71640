//! Resolution of signer references and the boundary to signature providers.
extern crate alloc;

use alloc::collections::BTreeMap;
use core::fmt::{Debug, Display};

use crate::{
    Certificate, EcdsaSignature, EccPoint, EncodeError, HashedId8, PublicKey, SecuredMessage,
    Signature, SignerInfo, TrailerField,
};

/// Source of certificates known by their digest
pub trait CertificateStore {
    fn lookup(&self, digest: &HashedId8) -> Option<Certificate>;
}

impl CertificateStore for BTreeMap<HashedId8, Certificate> {
    fn lookup(&self, digest: &HashedId8) -> Option<Certificate> {
        self.get(digest).cloned()
    }
}

/// Certificate whose key verifies a signature
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedSigner<'a> {
    /// The signed structure is verified with its own key
    SelfSigned,
    Embedded(&'a Certificate),
    Stored(Certificate),
}

impl ResolvedSigner<'_> {
    #[must_use]
    pub fn certificate(&self) -> Option<&Certificate> {
        match self {
            ResolvedSigner::SelfSigned => None,
            ResolvedSigner::Embedded(certificate) => Some(certificate),
            ResolvedSigner::Stored(certificate) => Some(certificate),
        }
    }

    #[must_use]
    pub fn into_certificate(self) -> Option<Certificate> {
        match self {
            ResolvedSigner::SelfSigned => None,
            ResolvedSigner::Embedded(certificate) => Some(certificate.clone()),
            ResolvedSigner::Stored(certificate) => Some(certificate),
        }
    }
}

/// Signer info that does not lead to a certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedSignerReference {
    UnknownDigest { digest: HashedId8 },
    EmptyChain,
    UnsupportedSignerType(u8),
}

impl Display for UnresolvedSignerReference {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            UnresolvedSignerReference::UnknownDigest { digest } => {
                write!(f, "No certificate known for digest ")?;
                digest.0.iter().try_for_each(|byte| write!(f, "{byte:02x}"))
            }
            UnresolvedSignerReference::EmptyChain => f.write_str("Certificate chain is empty"),
            UnresolvedSignerReference::UnsupportedSignerType(signer_type) => {
                write!(f, "Signer info of type {signer_type} cannot be resolved")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UnresolvedSignerReference {}

/// Finds the certificate `signer` refers to.
///
/// Embedded certificates are returned as they are, chains resolve to their
/// first entry and digests are looked up in `store`.
pub fn resolve_signer<'a, S: CertificateStore + ?Sized>(
    signer: &'a SignerInfo,
    store: &S,
) -> Result<ResolvedSigner<'a>, UnresolvedSignerReference> {
    let digest = match signer {
        SignerInfo::SelfSigned => return Ok(ResolvedSigner::SelfSigned),
        SignerInfo::Certificate(certificate) => return Ok(ResolvedSigner::Embedded(certificate)),
        SignerInfo::CertificateChain(chain) => {
            return chain
                .first()
                .map(ResolvedSigner::Embedded)
                .ok_or(UnresolvedSignerReference::EmptyChain)
        }
        SignerInfo::CertificateDigestWithSha256(digest) => digest,
        SignerInfo::CertificateDigestWithOtherAlgorithm(other) => &other.digest,
        SignerInfo::Unknown(unknown) => {
            return Err(UnresolvedSignerReference::UnsupportedSignerType(
                unknown.type_id,
            ))
        }
    };
    log::trace!("Looking up signer certificate {digest:?}");
    store
        .lookup(digest)
        .map(ResolvedSigner::Stored)
        .ok_or(UnresolvedSignerReference::UnknownDigest { digest: *digest })
}

/// Producer of signatures over byte sequences
pub trait Signer {
    type Error: Debug;

    /// Signature of the size `sign` produces. Stands in for the final
    /// signature while the signed bytes are computed.
    fn placeholder(&self) -> Signature {
        Signature::EcdsaNistP256(EcdsaSignature {
            r: EccPoint::XCoordinateOnly([0; 32]),
            s: [0; 32],
        })
    }

    fn sign(&self, data: &[u8]) -> Result<Signature, Self::Error>;
}

pub trait Verifier {
    type Error: Debug;

    /// Checks `signature` over `data` against `key`.
    fn verify(
        &self,
        data: &[u8],
        signature: &Signature,
        key: &PublicKey,
    ) -> Result<bool, Self::Error>;
}

#[derive(Debug, PartialEq)]
pub enum SigningError<E> {
    Encode(EncodeError),
    Signer(E),
    /// The message already carries a signature trailer field
    AlreadySigned,
}

impl<E: Debug> Display for SigningError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SigningError::Encode(e) => write!(f, "Failed to encode signed bytes: {e}"),
            SigningError::Signer(e) => write!(f, "Signature provider failed: {e:?}"),
            SigningError::AlreadySigned => f.write_str("Message is already signed"),
        }
    }
}

impl SecuredMessage {
    /// Appends a signature trailer field created by `signer`.
    pub fn sign_with<S: Signer>(&mut self, signer: &S) -> Result<(), SigningError<S::Error>> {
        if self.signature().is_some() {
            return Err(SigningError::AlreadySigned);
        }
        self.trailer_fields
            .push(TrailerField::Signature(signer.placeholder()));
        let signature = self
            .signing_bytes()
            .map_err(SigningError::Encode)
            .and_then(|data| signer.sign(&data).map_err(SigningError::Signer));
        self.trailer_fields.pop();
        self.trailer_fields
            .push(TrailerField::Signature(signature?));
        Ok(())
    }
}

impl Certificate {
    /// Replaces the signature with one created by `signer`.
    pub fn sign_with<S: Signer>(&mut self, signer: &S) -> Result<(), SigningError<S::Error>> {
        let data = self.to_be_signed_bytes().map_err(SigningError::Encode)?;
        self.signature = signer.sign(&data).map_err(SigningError::Signer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test_vectors::*, Encode, HeaderField, Payload, PayloadType};

    /// Signs with the length of the data as `s`
    struct Counting;

    impl Signer for Counting {
        type Error = ();

        fn sign(&self, data: &[u8]) -> Result<Signature, ()> {
            let mut s = [0; 32];
            s[24..].copy_from_slice(&(data.len() as u64).to_be_bytes());
            Ok(Signature::EcdsaNistP256(EcdsaSignature {
                r: EccPoint::XCoordinateOnly([0xab; 32]),
                s,
            }))
        }
    }

    struct Failing;

    impl Signer for Failing {
        type Error = &'static str;

        fn sign(&self, _: &[u8]) -> Result<Signature, &'static str> {
            Err("no key")
        }
    }

    #[test]
    fn resolves_embedded_and_stored_signers() {
        let root = Certificate::from_bytes(&bytes(ROOT_CERTIFICATE)).unwrap();
        let aa1 = Certificate::from_bytes(&bytes(AA1_CERTIFICATE)).unwrap();
        let ea = Certificate::from_bytes(&bytes(EA_CERTIFICATE)).unwrap();
        let mut store = BTreeMap::new();

        assert_eq!(
            resolve_signer(&root.signer_info, &store),
            Ok(ResolvedSigner::SelfSigned)
        );
        assert_eq!(
            resolve_signer(&ea.signer_info, &store),
            Ok(ResolvedSigner::Embedded(&root))
        );
        let root_digest = HashedId8([0x83, 0xca, 0x21, 0x68, 0xb7, 0x84, 0xfc, 0x6c]);
        assert_eq!(
            resolve_signer(&aa1.signer_info, &store),
            Err(UnresolvedSignerReference::UnknownDigest {
                digest: root_digest
            })
        );
        store.insert(root_digest, root.clone());
        let resolved = resolve_signer(&aa1.signer_info, &store).unwrap();
        assert_eq!(resolved.certificate(), Some(&root));
        assert_eq!(resolved.into_certificate(), Some(root.clone()));

        let chain = SignerInfo::CertificateChain(vec![aa1.clone(), root]);
        assert_eq!(
            resolve_signer(&chain, &store),
            Ok(ResolvedSigner::Embedded(&aa1))
        );
        assert_eq!(
            resolve_signer(&SignerInfo::CertificateChain(vec![]), &store),
            Err(UnresolvedSignerReference::EmptyChain)
        );
    }

    #[test]
    fn describes_unresolved_digest() {
        let error = UnresolvedSignerReference::UnknownDigest {
            digest: HashedId8([0xa8, 0xed, 0x6d, 0xf6, 0x5b, 0x0e, 0x6d, 0x6a]),
        };
        assert_eq!(
            alloc::format!("{error}"),
            "No certificate known for digest a8ed6df65b0e6d6a"
        );
    }

    #[test]
    fn signs_message_over_signing_bytes() {
        let mut message = SecuredMessage::new(Payload::new(PayloadType::Signed, [1, 2, 3]));
        message.header_fields = vec![
            HeaderField::SignerInfo(SignerInfo::SelfSigned),
            HeaderField::MessageType(2),
        ];
        message.sign_with(&Counting).unwrap();

        let signing_bytes = message.signing_bytes().unwrap();
        assert_eq!(message.signature(), Counting.sign(&signing_bytes).ok().as_ref());
        let encoded = message.encode_to_vec().unwrap();
        assert_eq!(encoded[..signing_bytes.len()], signing_bytes);
        assert_eq!(SecuredMessage::from_bytes(&encoded).unwrap(), message);

        assert_eq!(message.sign_with(&Counting), Err(SigningError::AlreadySigned));
    }

    #[test]
    fn keeps_message_unchanged_when_signing_fails() {
        let mut message = SecuredMessage::new(Payload::new(PayloadType::Signed, [1]));
        let original = message.clone();
        assert_eq!(message.sign_with(&Failing), Err(SigningError::Signer("no key")));
        assert_eq!(message, original);
    }

    #[test]
    fn signs_certificate() {
        let mut certificate = Certificate::from_bytes(&bytes(AA2_CERTIFICATE)).unwrap();
        let data = certificate.to_be_signed_bytes().unwrap();
        certificate.sign_with(&Counting).unwrap();
        assert_eq!(Some(certificate.signature), Counting.sign(&data).ok());
    }
}
