//! Immutable message payloads
//!
//! A [`Message`] is an ordered, immutable sequence of typed [`Value`] fields.
//! Clones share the underlying storage, so a message can be enqueued to many
//! mailboxes without copying its fields.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::TypeError;
use crate::exit::ExitMsg;
use crate::id::ActorId;

/// One typed field of a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Unit,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    Actor(ActorId),
    Exit(ExitMsg),
}

/// Discriminant of a [`Value`], used for type signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Unit,
    Bool,
    I64,
    U64,
    F64,
    Str,
    Bytes,
    Actor,
    Exit,
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Unit => ValueType::Unit,
            Value::Bool(_) => ValueType::Bool,
            Value::I64(_) => ValueType::I64,
            Value::U64(_) => ValueType::U64,
            Value::F64(_) => ValueType::F64,
            Value::Str(_) => ValueType::Str,
            Value::Bytes(_) => ValueType::Bytes,
            Value::Actor(_) => ValueType::Actor,
            Value::Exit(_) => ValueType::Exit,
        }
    }
}

/// Immutable ordered payload
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Value>", into = "Vec<Value>")]
pub struct Message {
    fields: Arc<[Value]>,
}

impl Message {
    pub fn new(fields: Vec<Value>) -> Self {
        Self {
            fields: fields.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.fields.get(index)
    }

    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    /// Type signature of this message, one entry per field
    pub fn types(&self) -> Vec<ValueType> {
        self.fields.iter().map(Value::value_type).collect()
    }

    /// Whether the field types equal `signature` exactly
    pub fn matches(&self, signature: &[ValueType]) -> bool {
        self.fields.len() == signature.len()
            && self
                .fields
                .iter()
                .zip(signature)
                .all(|(field, ty)| field.value_type() == *ty)
    }

    /// The exit request carried by this message, if it is one
    pub fn as_exit(&self) -> Option<&ExitMsg> {
        match self.fields.as_ref() {
            [Value::Exit(exit)] => Some(exit),
            _ => None,
        }
    }

    pub fn i64_at(&self, index: usize) -> Result<i64, TypeError> {
        match self.field(index)? {
            Value::I64(v) => Ok(*v),
            other => Err(TypeError::field_type(index, ValueType::I64, other.value_type())),
        }
    }

    pub fn u64_at(&self, index: usize) -> Result<u64, TypeError> {
        match self.field(index)? {
            Value::U64(v) => Ok(*v),
            other => Err(TypeError::field_type(index, ValueType::U64, other.value_type())),
        }
    }

    pub fn str_at(&self, index: usize) -> Result<&str, TypeError> {
        match self.field(index)? {
            Value::Str(v) => Ok(v),
            other => Err(TypeError::field_type(index, ValueType::Str, other.value_type())),
        }
    }

    pub fn bytes_at(&self, index: usize) -> Result<&[u8], TypeError> {
        match self.field(index)? {
            Value::Bytes(v) => Ok(v),
            other => Err(TypeError::field_type(index, ValueType::Bytes, other.value_type())),
        }
    }

    fn field(&self, index: usize) -> Result<&Value, TypeError> {
        self.fields
            .get(index)
            .ok_or_else(|| TypeError::out_of_range(index, self.fields.len()))
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.fields.iter()).finish()
    }
}

impl From<Vec<Value>> for Message {
    fn from(fields: Vec<Value>) -> Self {
        Self::new(fields)
    }
}

impl From<Message> for Vec<Value> {
    fn from(msg: Message) -> Self {
        msg.fields.to_vec()
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::U64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<ActorId> for Value {
    fn from(v: ActorId) -> Self {
        Value::Actor(v)
    }
}

impl From<ExitMsg> for Value {
    fn from(v: ExitMsg) -> Self {
        Value::Exit(v)
    }
}

/// Conversion of a payload into a [`Message`]
pub trait IntoMessage {
    fn into_message(self) -> Message;
}

/// Payloads whose field types are known at compile time
pub trait StaticSignature {
    fn signature() -> Vec<ValueType>;
}

/// A Rust type that maps to exactly one [`ValueType`]
pub trait Field: Into<Value> {
    const TYPE: ValueType;
}

impl IntoMessage for Message {
    fn into_message(self) -> Message {
        self
    }
}

macro_rules! field_types {
    ($($ty:ty => $vt:ident),+ $(,)?) => {
        $(
            impl Field for $ty {
                const TYPE: ValueType = ValueType::$vt;
            }

            impl IntoMessage for $ty {
                fn into_message(self) -> Message {
                    Message::new(vec![self.into()])
                }
            }

            impl StaticSignature for $ty {
                fn signature() -> Vec<ValueType> {
                    vec![ValueType::$vt]
                }
            }
        )+
    };
}

field_types! {
    () => Unit,
    bool => Bool,
    i64 => I64,
    u64 => U64,
    f64 => F64,
    String => Str,
    Vec<u8> => Bytes,
    ActorId => Actor,
    ExitMsg => Exit,
}

impl<'a> Field for &'a str {
    const TYPE: ValueType = ValueType::Str;
}

impl<'a> IntoMessage for &'a str {
    fn into_message(self) -> Message {
        Message::new(vec![self.into()])
    }
}

impl<'a> StaticSignature for &'a str {
    fn signature() -> Vec<ValueType> {
        vec![ValueType::Str]
    }
}

macro_rules! tuple_messages {
    ($($ty:ident : $var:ident),+) => {
        impl<$($ty: Field),+> IntoMessage for ($($ty,)+) {
            fn into_message(self) -> Message {
                let ($($var,)+) = self;
                Message::new(vec![$($var.into()),+])
            }
        }

        impl<$($ty: Field),+> StaticSignature for ($($ty,)+) {
            fn signature() -> Vec<ValueType> {
                vec![$($ty::TYPE),+]
            }
        }
    };
}

tuple_messages!(A: a);
tuple_messages!(A: a, B: b);
tuple_messages!(A: a, B: b, C: c);
tuple_messages!(A: a, B: b, C: c, D: d);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::ExitReason;

    #[test]
    fn test_tuple_conversion_keeps_order() {
        let msg = (1_i64, "two", 3_u64).into_message();
        assert_eq!(msg.len(), 3);
        assert_eq!(msg.i64_at(0).unwrap(), 1);
        assert_eq!(msg.str_at(1).unwrap(), "two");
        assert_eq!(msg.u64_at(2).unwrap(), 3);
        assert_eq!(msg.types(), vec![ValueType::I64, ValueType::Str, ValueType::U64]);
    }

    #[test]
    fn test_static_signature_matches_runtime_types() {
        let msg = (5_i64, String::from("x")).into_message();
        assert!(msg.matches(&<(i64, String)>::signature()));
        assert!(!msg.matches(&<(i64,)>::signature()));
        assert!(!msg.matches(&<(String, i64)>::signature()));
    }

    #[test]
    fn test_field_access_errors() {
        let msg = "hello".into_message();
        assert_eq!(
            msg.i64_at(0),
            Err(TypeError::field_type(0, ValueType::I64, ValueType::Str))
        );
        assert_eq!(msg.str_at(3), Err(TypeError::out_of_range(3, 1)));
    }

    #[test]
    fn test_clone_shares_fields() {
        let msg = (vec![1_u8, 2, 3],).into_message();
        let copy = msg.clone();
        assert!(Arc::ptr_eq(&msg.fields, &copy.fields));
        assert_eq!(copy.bytes_at(0).unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn test_exit_detection() {
        let exit = ExitMsg::anonymous(ExitReason::Kill).into_message();
        assert_eq!(exit.as_exit().map(|e| e.reason), Some(ExitReason::Kill));
        assert!((1_i64, ExitMsg::anonymous(ExitReason::Kill)).into_message().as_exit().is_none());
    }

    #[test]
    fn test_serde_shape_survives_bincode() {
        let msg = (7_i64, true, vec![0xAA_u8]).into_message();
        let bytes = bincode::serialize(&msg).unwrap();
        let decoded: Message = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, msg);
    }
}
