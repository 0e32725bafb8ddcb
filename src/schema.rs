//! # Message and Field Descriptors
//!
//! In-memory schema the codec consumes. Schema ingestion (parsing from
//! external definition files) happens outside this crate; by the time a
//! [`MessageDescriptor`] reaches [`crate::Registry::load`] it is assumed
//! structurally sound, and the codec performs only its own semantic
//! validation: ID uniqueness, size-law self-consistency, transform-name
//! resolution.
//!
//! Descriptors are immutable after load except for trigger bookkeeping
//! (fire counter), and are owned exclusively by the registry.

use crate::value::FieldValue;

/// Closed set of field value types. The numeric tag is the type identifier
/// used by summaries and any configuration surface that crosses a process
/// boundary.
#[repr(u8)]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    num_enum::TryFromPrimitive,
    num_enum::IntoPrimitive,
)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldKind {
    Int = 1,
    Float = 2,
    Bool = 3,
    String = 4,
    Bytes = 5,
    Enum = 6,
    Nested = 7,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Int => "int",
            FieldKind::Float => "float",
            FieldKind::Bool => "bool",
            FieldKind::String => "string",
            FieldKind::Bytes => "bytes",
            FieldKind::Enum => "enum",
            FieldKind::Nested => "nested",
        }
    }
}

/// One named, typed, bounded-size field of a message.
///
/// Type parameters live alongside the kind tag rather than inside it; the
/// per-kind codecs check at schema-validation time that the parameters they
/// require are present ([`crate::SchemaError::MissingParameter`]).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,

    /// Declared element count; 1 means scalar. Shorter supplied value lists
    /// are padded with absent placeholders so the slot count is constant.
    pub array_length: usize,

    /// Ordered transform names applied to each element before packing.
    pub transforms: Vec<String>,

    /// External variable that feeds this field. Defaults to the message's
    /// trigger variable when left unset on a publish-triggered message.
    pub source_var: Option<String>,

    /// When the source variable carries `key=value` pairs, the key to pull
    /// this field's value from. Defaults to the field name.
    pub source_key: Option<String>,

    /// Place this field in the fixed-size plaintext header region instead
    /// of the (optionally encrypted) body. Variable-size codecs are
    /// rejected here at validation time.
    pub in_header: bool,

    // Type parameters; which ones are required depends on `kind`.
    pub int_min: Option<i64>,
    pub int_max: Option<i64>,
    pub float_min: Option<f64>,
    pub float_max: Option<f64>,
    /// Decimal digits of precision retained for float fields.
    pub precision: Option<u32>,
    /// Maximum content length in bytes for string fields.
    pub max_length: Option<usize>,
    /// Exact width in bytes for blob fields.
    pub num_bytes: Option<usize>,
    /// Enumeration labels, in tag order.
    pub labels: Vec<String>,
    /// Ordered subfields of a nested message field.
    pub subfields: Vec<FieldDescriptor>,
}

impl FieldDescriptor {
    fn base(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            array_length: 1,
            transforms: Vec::new(),
            source_var: None,
            source_key: None,
            in_header: false,
            int_min: None,
            int_max: None,
            float_min: None,
            float_max: None,
            precision: None,
            max_length: None,
            num_bytes: None,
            labels: Vec::new(),
            subfields: Vec::new(),
        }
    }

    /// Bounded signed integer field.
    pub fn int(name: &str, min: i64, max: i64) -> Self {
        let mut f = Self::base(name, FieldKind::Int);
        f.int_min = Some(min);
        f.int_max = Some(max);
        f
    }

    /// Bounded float field keeping `precision` decimal digits.
    pub fn float(name: &str, min: f64, max: f64, precision: u32) -> Self {
        let mut f = Self::base(name, FieldKind::Float);
        f.float_min = Some(min);
        f.float_max = Some(max);
        f.precision = Some(precision);
        f
    }

    pub fn boolean(name: &str) -> Self {
        Self::base(name, FieldKind::Bool)
    }

    /// Variable-length string field holding at most `max_length` bytes.
    pub fn string(name: &str, max_length: usize) -> Self {
        let mut f = Self::base(name, FieldKind::String);
        f.max_length = Some(max_length);
        f
    }

    /// Fixed-width byte blob of exactly `num_bytes`.
    pub fn bytes(name: &str, num_bytes: usize) -> Self {
        let mut f = Self::base(name, FieldKind::Bytes);
        f.num_bytes = Some(num_bytes);
        f
    }

    /// Enumeration over the given labels.
    pub fn enumeration(name: &str, labels: &[&str]) -> Self {
        let mut f = Self::base(name, FieldKind::Enum);
        f.labels = labels.iter().map(|&l| l.to_owned()).collect();
        f
    }

    /// Nested message field with its own ordered subfields.
    pub fn nested(name: &str, subfields: Vec<FieldDescriptor>) -> Self {
        let mut f = Self::base(name, FieldKind::Nested);
        f.subfields = subfields;
        f
    }

    pub fn with_array_length(mut self, len: usize) -> Self {
        self.array_length = len;
        self
    }

    pub fn with_transforms(mut self, names: &[&str]) -> Self {
        self.transforms = names.iter().map(|&n| n.to_owned()).collect();
        self
    }

    pub fn with_source(mut self, variable: &str) -> Self {
        self.source_var = Some(variable.to_owned());
        self
    }

    pub fn with_source_key(mut self, key: &str) -> Self {
        self.source_key = Some(key.to_owned());
        self
    }

    pub fn in_header(mut self) -> Self {
        self.in_header = true;
        self
    }
}

/// Condition under which a message is due for encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum TriggerRule {
    /// Fire when an external publish on `variable` arrives and, if a
    /// mandatory substring is configured, the publish content contains it.
    /// The same variable may trigger several messages; the substring lets
    /// them disambiguate on content.
    OnPublish {
        variable: String,
        mandatory_content: Option<String>,
    },

    /// Fire on elapsed wall-clock time: due whenever elapsed-since-start
    /// exceeds `(fire_count + 1) * interval_secs`.
    OnTime { interval_secs: u64 },
}

impl TriggerRule {
    pub fn on_publish(variable: &str) -> Self {
        TriggerRule::OnPublish {
            variable: variable.to_owned(),
            mandatory_content: None,
        }
    }

    pub fn on_publish_containing(variable: &str, mandatory: &str) -> Self {
        TriggerRule::OnPublish {
            variable: variable.to_owned(),
            mandatory_content: Some(mandatory.to_owned()),
        }
    }
}

/// One loaded message schema: unique name, unique numeric ID, ordered
/// fields, one trigger rule, optional header defaults.
#[derive(Debug, Clone)]
pub struct MessageDescriptor {
    pub name: String,
    pub id: u32,
    pub trigger: TriggerRule,
    pub fields: Vec<FieldDescriptor>,

    /// Destination node ID stamped into the header when the caller does not
    /// supply one.
    pub dest_default: Option<u16>,

    /// Variable name whose publishes carry this message inbound; lets the
    /// surrounding middleware route received wire strings to the decoder.
    pub in_var: Option<String>,

    pub(crate) fire_count: u32,
}

impl MessageDescriptor {
    pub fn new(name: &str, id: u32, trigger: TriggerRule, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.to_owned(),
            id,
            trigger,
            fields,
            dest_default: None,
            in_var: None,
            fire_count: 0,
        }
    }

    pub fn with_dest_default(mut self, dest: u16) -> Self {
        self.dest_default = Some(dest);
        self
    }

    pub fn with_in_var(mut self, variable: &str) -> Self {
        self.in_var = Some(variable.to_owned());
        self
    }

    /// How many times the time trigger has fired for this message.
    pub fn fire_count(&self) -> u32 {
        self.fire_count
    }

    /// Fields belonging to the plaintext header region, in order.
    pub fn header_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.in_header)
    }

    /// Fields belonging to the body, in order.
    pub fn body_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.in_header)
    }

    /// Default (all-absent) value list for one field, used when the body is
    /// missing entirely and for padding short value lists.
    pub(crate) fn default_values(field: &FieldDescriptor) -> Vec<FieldValue> {
        vec![FieldValue::Absent; field.array_length]
    }
}
