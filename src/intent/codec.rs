//! Canonical signable encoding
//!
//! An intent encodes to a compact JSON object whose keys follow the declared
//! field order, with `nonce` appended last. Every scalar renders as a JSON
//! string in canonical form; record lists render as arrays of objects using
//! their own declared order. Absent optional fields are omitted, present but
//! empty ones encode as `""`. The SHA-256 digest of these bytes is signed.

use sha2::{Digest, Sha256};

use super::nonce::Nonce;
use super::schema::{FieldSpec, IntentKind, Presence, NONCE_FIELD};
use crate::error::{Error, Result};

/// Typed field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Unsigned(u128),
    Signed(i64),
    Text(String),
    Bool(bool),
    Records(Vec<FieldSet>),
}

impl FieldValue {
    /// Parse a base-10 unsigned integer, rejecting signs and leading zeros
    pub fn parse_unsigned(s: &str) -> Result<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::IntentBuild(format!(
                "'{}' is not a canonical unsigned integer",
                s
            )));
        }
        if s.len() > 1 && s.starts_with('0') {
            return Err(Error::IntentBuild(format!("'{}' has leading zeros", s)));
        }
        s.parse::<u128>()
            .map(FieldValue::Unsigned)
            .map_err(|e| Error::IntentBuild(format!("'{}': {}", s, e)))
    }

    fn write(&self, out: &mut String) -> Result<()> {
        match self {
            FieldValue::Unsigned(v) => write_string(out, &v.to_string()),
            FieldValue::Signed(v) => write_string(out, &v.to_string()),
            FieldValue::Text(v) => write_string(out, v),
            FieldValue::Bool(v) => write_string(out, if *v { "true" } else { "false" }),
            FieldValue::Records(records) => {
                out.push('[');
                for (i, record) in records.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    record.write(out, None)?;
                }
                out.push(']');
                Ok(())
            }
        }
    }
}

impl From<u128> for FieldValue {
    fn from(v: u128) -> Self {
        FieldValue::Unsigned(v)
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::Unsigned(v as u128)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Unsigned(v as u128)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Signed(v as i64)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<Vec<FieldSet>> for FieldValue {
    fn from(v: Vec<FieldSet>) -> Self {
        FieldValue::Records(v)
    }
}

fn write_string(out: &mut String, value: &str) -> Result<()> {
    out.push_str(&serde_json::to_string(value)?);
    Ok(())
}

/// Values slotted against a declared schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSet {
    schema: &'static [FieldSpec],
    values: Vec<Option<FieldValue>>,
}

impl FieldSet {
    pub fn builder(schema: &'static [FieldSpec]) -> FieldSetBuilder {
        FieldSetBuilder {
            set: FieldSet {
                schema,
                values: vec![None; schema.len()],
            },
            error: None,
        }
    }

    /// Value of a declared field, if present
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.schema
            .iter()
            .position(|spec| spec.name == name)
            .and_then(|i| self.values[i].as_ref())
    }

    fn write(&self, out: &mut String, nonce: Option<&str>) -> Result<()> {
        out.push('{');
        let mut first = true;
        for (spec, value) in self.schema.iter().zip(&self.values) {
            let Some(value) = value else { continue };
            if !first {
                out.push(',');
            }
            first = false;
            write_string(out, spec.name)?;
            out.push(':');
            value.write(out)?;
        }
        if let Some(nonce) = nonce {
            if !first {
                out.push(',');
            }
            write_string(out, NONCE_FIELD)?;
            out.push(':');
            write_string(out, nonce)?;
        }
        out.push('}');
        Ok(())
    }
}

/// Collects values for a [`FieldSet`], reporting the first problem at `build`
#[derive(Debug)]
pub struct FieldSetBuilder {
    set: FieldSet,
    error: Option<String>,
}

impl FieldSetBuilder {
    /// Set a declared field
    pub fn field(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        if self.error.is_some() {
            return self;
        }
        match self.set.schema.iter().position(|spec| spec.name == name) {
            Some(i) if self.set.values[i].is_some() => {
                self.error = Some(format!("field '{}' set twice", name));
            }
            Some(i) => self.set.values[i] = Some(value.into()),
            None => self.error = Some(format!("field '{}' is not declared", name)),
        }
        self
    }

    /// Set an optional field only when a value is present
    pub fn optional<V: Into<FieldValue>>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.field(name, v),
            None => self,
        }
    }

    pub fn build(self) -> Result<FieldSet> {
        if let Some(error) = self.error {
            return Err(Error::IntentBuild(error));
        }
        for (spec, value) in self.set.schema.iter().zip(&self.set.values) {
            if spec.presence == Presence::Required && value.is_none() {
                return Err(Error::IntentBuild(format!(
                    "required field '{}' missing",
                    spec.name
                )));
            }
        }
        Ok(self.set)
    }
}

/// Signable operation: kind, declared fields and a single-use nonce
#[derive(Debug)]
pub struct Intent {
    kind: IntentKind,
    fields: FieldSet,
    nonce: Nonce,
}

impl Intent {
    pub fn builder(kind: IntentKind) -> IntentBuilder {
        IntentBuilder {
            kind,
            fields: FieldSet::builder(kind.fields()),
        }
    }

    pub fn kind(&self) -> IntentKind {
        self.kind
    }

    pub fn nonce(&self) -> &str {
        self.nonce.as_str()
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    /// Canonical bytes covered by the signature
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.canonical_string()?.into_bytes())
    }

    pub(crate) fn canonical_string(&self) -> Result<String> {
        let mut out = String::with_capacity(256);
        self.fields.write(&mut out, Some(self.nonce.as_str()))?;
        Ok(out)
    }

    /// SHA-256 of the canonical bytes
    pub fn digest(&self) -> Result<[u8; 32]> {
        Ok(digest(&self.canonical_bytes()?))
    }
}

/// SHA-256 over arbitrary bytes
pub fn digest(bytes: &[u8]) -> [u8; 32] {
    let hash = Sha256::digest(bytes);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    out
}

/// Builder for [`Intent`]; the nonce is consumed at `build`
#[derive(Debug)]
pub struct IntentBuilder {
    kind: IntentKind,
    fields: FieldSetBuilder,
}

impl IntentBuilder {
    pub fn field(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.fields = self.fields.field(name, value);
        self
    }

    pub fn optional<V: Into<FieldValue>>(mut self, name: &str, value: Option<V>) -> Self {
        self.fields = self.fields.optional(name, value);
        self
    }

    pub fn build(self, nonce: Nonce) -> Result<Intent> {
        Ok(Intent {
            kind: self.kind,
            fields: self.fields.build()?,
            nonce,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::schema::ROUTE_HOP_FIELDS;

    fn claim(nonce: &str, escrow: &str) -> Intent {
        Intent::builder(IntentKind::ClaimEscrow)
            .field("claimantPublicKey", "02aa")
            .field("escrowId", escrow)
            .build(Nonce::from_string(nonce.to_string()))
            .unwrap()
    }

    fn host_fees(asset_b: Option<&str>) -> Intent {
        Intent::builder(IntentKind::WithdrawHostFees)
            .field("hostPublicKey", "02bb")
            .field("poolId", "pool")
            .optional("assetBAmount", asset_b)
            .build(Nonce::from_string("n1".to_string()))
            .unwrap()
    }

    #[test]
    fn test_canonical_layout() {
        let intent = claim("abc", "esc-1");
        assert_eq!(
            intent.canonical_string().unwrap(),
            r#"{"claimantPublicKey":"02aa","escrowId":"esc-1","nonce":"abc"}"#
        );
    }

    #[test]
    fn test_declared_order_not_call_order() {
        let a = Intent::builder(IntentKind::Clawback)
            .field("custodyPublicKey", "pool")
            .field("transferId", "t1")
            .field("senderPublicKey", "me")
            .build(Nonce::from_string("n".to_string()))
            .unwrap();
        assert_eq!(
            a.canonical_string().unwrap(),
            r#"{"senderPublicKey":"me","transferId":"t1","custodyPublicKey":"pool","nonce":"n"}"#
        );
    }

    #[test]
    fn test_deterministic_bytes_and_digest() {
        let a = claim("n-1", "esc");
        let b = claim("n-1", "esc");
        assert_eq!(a.canonical_bytes().unwrap(), b.canonical_bytes().unwrap());
        assert_eq!(a.digest().unwrap(), b.digest().unwrap());
        assert_ne!(a.digest().unwrap(), claim("n-2", "esc").digest().unwrap());
    }

    #[test]
    fn test_absent_differs_from_empty() {
        let absent = host_fees(None);
        let empty = host_fees(Some(""));
        assert!(!absent.canonical_string().unwrap().contains("assetBAmount"));
        assert!(empty.canonical_string().unwrap().contains(r#""assetBAmount":"""#));
        assert_ne!(absent.digest().unwrap(), empty.digest().unwrap());
    }

    #[test]
    fn test_numbers_render_canonically() {
        let intent = Intent::builder(IntentKind::RemoveLiquidity)
            .field("userPublicKey", "u")
            .field("poolId", "p")
            .field("lpTokensToRemove", 1_000_000_000_000_000_000_000u128)
            .field("tickLower", -120i32)
            .field("tickUpper", 0i32)
            .build(Nonce::from_string("n".to_string()))
            .unwrap();
        let encoded = intent.canonical_string().unwrap();
        assert!(encoded.contains(r#""lpTokensToRemove":"1000000000000000000000""#));
        assert!(encoded.contains(r#""tickLower":"-120""#));
        assert!(encoded.contains(r#""tickUpper":"0""#));
    }

    #[test]
    fn test_records_and_escaping() {
        let hop = FieldSet::builder(ROUTE_HOP_FIELDS)
            .field("poolId", "p\"1")
            .field("assetInAddress", "a")
            .field("assetOutAddress", "b")
            .build()
            .unwrap();
        let intent = Intent::builder(IntentKind::ExecuteRouteSwap)
            .field("userPublicKey", "u")
            .field("hops", vec![hop])
            .field("initialAssetAddress", "a")
            .field("inputAmount", 5u128)
            .field("minAmountOut", 4u128)
            .field("maxRouteSlippageBps", 100u32)
            .field("initialTransferId", "t")
            .build(Nonce::from_string("n".to_string()))
            .unwrap();
        let encoded = intent.canonical_string().unwrap();
        assert!(encoded.contains(
            r#""hops":[{"poolId":"p\"1","assetInAddress":"a","assetOutAddress":"b"}]"#
        ));
    }

    #[test]
    fn test_builder_rejects_bad_fields() {
        let undeclared = Intent::builder(IntentKind::ClaimEscrow)
            .field("claimantPublicKey", "a")
            .field("escrowId", "e")
            .field("amount", 5u128)
            .build(Nonce::from_string("n".to_string()));
        assert!(matches!(undeclared, Err(Error::IntentBuild(_))));

        let missing = Intent::builder(IntentKind::ClaimEscrow)
            .field("claimantPublicKey", "a")
            .build(Nonce::from_string("n".to_string()));
        assert!(matches!(missing, Err(Error::IntentBuild(_))));

        let twice = Intent::builder(IntentKind::ClaimEscrow)
            .field("claimantPublicKey", "a")
            .field("claimantPublicKey", "b")
            .field("escrowId", "e")
            .build(Nonce::from_string("n".to_string()));
        assert!(twice.is_err());
    }

    #[test]
    fn test_parse_unsigned() {
        assert_eq!(FieldValue::parse_unsigned("0").unwrap(), FieldValue::Unsigned(0));
        assert_eq!(FieldValue::parse_unsigned("42").unwrap(), FieldValue::Unsigned(42));
        assert!(FieldValue::parse_unsigned("042").is_err());
        assert!(FieldValue::parse_unsigned("+42").is_err());
        assert!(FieldValue::parse_unsigned("-1").is_err());
        assert!(FieldValue::parse_unsigned("").is_err());
        assert!(FieldValue::parse_unsigned("1e3").is_err());
    }
}
