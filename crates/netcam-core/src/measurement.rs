//! Measurements observed by device drivers
//!
//! A measurement is a record whose declared fields are all optional (a
//! driver may fail to observe any sub-value) and which keeps any extra
//! fields the driver reports. Per check type the shape is declared by a
//! plain struct implementing [`MeasurementSchema`]; the struct's `FIELDS`
//! list is the comparison schema, so no runtime reflection is involved.

use crate::error::{NetcamError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Typed measurement record for one check type.
///
/// Every field of an implementing struct should be an `Option<_>` and the
/// struct should carry a `#[serde(flatten)]` map for vendor extras.
pub trait MeasurementSchema: Serialize {
    /// Declared fields in comparison order.
    const FIELDS: &'static [&'static str];

    fn to_measurement(&self) -> Result<Measurement> {
        Measurement::from_record(self, Self::FIELDS)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    #[serde(skip)]
    schema: Vec<String>,
    #[serde(flatten)]
    values: Map<String, Value>,
}

impl Measurement {
    /// Empty measurement declaring `fields` as its schema.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            schema: fields.into_iter().map(Into::into).collect(),
            values: Map::new(),
        }
    }

    /// Build from any serializable record; `null` members count as unobserved.
    pub fn from_record<T: Serialize + ?Sized>(record: &T, fields: &[&str]) -> Result<Self> {
        let values = match serde_json::to_value(record)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(NetcamError::Schema(format!(
                    "measurement must be a record, got {}",
                    other
                )))
            }
        };

        Ok(Self {
            schema: fields.iter().map(|f| f.to_string()).collect(),
            values: values.into_iter().filter(|(_, v)| !v.is_null()).collect(),
        })
    }

    /// Set an observed value; fields outside the schema are kept as extras.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let value = value.into();
        let field = field.into();
        if value.is_null() {
            self.values.remove(&field);
        } else {
            self.values.insert(field, value);
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Declared fields in schema order with their observed values.
    pub fn fields(&self) -> impl Iterator<Item = (&str, Option<&Value>)> + '_ {
        self.schema
            .iter()
            .map(move |f| (f.as_str(), self.values.get(f)))
    }

    /// Observed fields the schema does not declare.
    pub fn extra(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.values
            .iter()
            .filter(move |(k, _)| !self.schema.iter().any(|f| f == *k))
            .map(|(k, v)| (k.as_str(), v))
    }

    pub fn schema(&self) -> &[String] {
        &self.schema
    }

    /// Nothing was observed at all.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }
}
