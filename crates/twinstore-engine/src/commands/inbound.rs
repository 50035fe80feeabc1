//! Inbound request decoding
//!
//! Requests arrive with every field value as a raw string, the way a form
//! submits them. Decoding checks them against the catalog and produces a
//! validated [`Mutation`] plus the requested mode, if any.

#![allow(clippy::result_large_err)]

use serde::Deserialize;
use std::collections::BTreeMap;
use twinstore_core::model::catalog;
use twinstore_core::{Mode, ModelError, Mutation, MutationKind, Result, Value};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InboundRequest {
    pub entity: String,
    pub operation: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub id: Option<i64>,
}

impl InboundRequest {
    pub fn new(entity: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            operation: operation.into(),
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, raw: impl Into<String>) -> Self {
        self.fields.insert(name.into(), raw.into());
        self
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Requested mode; `None` when the request carries none
    ///
    /// # Errors
    ///
    /// `InvalidMode` for anything but primary / secondary / dual.
    pub fn requested_mode(&self) -> Result<Option<Mode>> {
        match self.mode.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Ok(Some(raw.parse::<Mode>()?)),
        }
    }

    /// Decode into a validated mutation.
    ///
    /// Empty strings decode to NULL, which only nullable fields accept.
    ///
    /// # Errors
    ///
    /// `UnknownEntity` or `InvalidInput`.
    pub fn decode(&self) -> Result<Mutation> {
        let spec = catalog::entity(&self.entity)?;
        let kind = self.operation.parse::<MutationKind>()?;

        let id = || {
            self.id.ok_or_else(|| ModelError::MissingIdentifier {
                entity: spec.name.to_string(),
            })
        };

        let mutation = match kind {
            MutationKind::Create => {
                if self.id.is_some() {
                    return Err(ModelError::UnexpectedIdentifier {
                        entity: spec.name.to_string(),
                    }
                    .into());
                }
                Mutation::create(spec.name, self.typed_fields()?)?
            }
            MutationKind::Update => Mutation::update(spec.name, id()?, self.typed_fields()?)?,
            MutationKind::Delete => Mutation::delete(spec.name, id()?)?,
        };
        Ok(mutation)
    }

    fn typed_fields(&self) -> std::result::Result<Vec<(&str, Value)>, ModelError> {
        let spec = catalog::entity(&self.entity)?;
        self.fields
            .iter()
            .map(|(name, raw)| {
                if name == spec.id_column {
                    return Err(ModelError::UnexpectedIdentifier {
                        entity: spec.name.to_string(),
                    });
                }
                let field = spec.field(name).ok_or_else(|| ModelError::UnknownField {
                    entity: spec.name.to_string(),
                    field: name.clone(),
                })?;
                let value = Value::parse(field.ty, raw).map_err(|reason| ModelError::InvalidValue {
                    entity: spec.name.to_string(),
                    field: name.clone(),
                    reason,
                })?;
                Ok((name.as_str(), value))
            })
            .collect()
    }
}
