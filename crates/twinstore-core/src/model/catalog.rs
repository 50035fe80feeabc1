//! Entity catalog
//!
//! The catalog is the single description of every logical record type: its
//! table, identifier column, ordered fields and the references other
//! entities hold to it. Column order here is the canonical record shape both
//! backends must return.

use crate::errors::ModelError;
use crate::model::FieldType;

/// How a field's value comes into existence when the caller does not
/// supply it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generated {
    /// Filled by the store at insert time with the transaction's commit time
    CommitTimestamp,
}

/// What happens to referencing rows when the referenced row is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// Referencing rows are deleted first
    Cascade,
    /// The referencing column is cleared
    SetNull,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub nullable: bool,
    pub generated: Option<Generated>,
}

impl FieldSpec {
    const fn required(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            nullable: false,
            generated: None,
        }
    }

    const fn optional(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            nullable: true,
            generated: None,
        }
    }

    const fn generated(name: &'static str, ty: FieldType, how: Generated) -> Self {
        Self {
            name,
            ty,
            nullable: false,
            generated: Some(how),
        }
    }

    pub fn is_writable(&self) -> bool {
        self.generated.is_none()
    }
}

/// A foreign reference held by a field of the owning entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub field: &'static str,
    pub target: &'static str,
    pub on_delete: OnDelete,
}

/// Description of one logical record type
#[derive(Debug, PartialEq, Eq)]
pub struct EntitySpec {
    pub name: &'static str,
    pub table: &'static str,
    pub id_column: &'static str,
    pub fields: &'static [FieldSpec],
    pub references: &'static [Reference],
}

impl EntitySpec {
    /// All column names in record order, identifier first
    pub fn columns(&self) -> Vec<&'static str> {
        std::iter::once(self.id_column)
            .chain(self.fields.iter().map(|f| f.name))
            .collect()
    }

    /// Column types in record order, identifier first
    pub fn shape(&self) -> Vec<FieldType> {
        std::iter::once(FieldType::Int64)
            .chain(self.fields.iter().map(|f| f.ty))
            .collect()
    }

    /// Fields a caller supplies on create/update, in catalog order
    pub fn writable_fields(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields.iter().filter(|f| f.is_writable())
    }

    /// Fields the store fills on insert, in catalog order
    pub fn generated_fields(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields.iter().filter(|f| !f.is_writable())
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Position of a column within a record (the identifier is 0)
    pub fn position(&self, column: &str) -> Option<usize> {
        if column == self.id_column {
            return Some(0);
        }
        self.fields
            .iter()
            .position(|f| f.name == column)
            .map(|p| p + 1)
    }
}

impl std::fmt::Display for EntitySpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

pub static PRODUCT: EntitySpec = EntitySpec {
    name: "product",
    table: "products",
    id_column: "product_id",
    fields: &[
        FieldSpec::required("name", FieldType::String),
        FieldSpec::required("category", FieldType::String),
        FieldSpec::required("price", FieldType::Float64),
        FieldSpec::optional("description", FieldType::String),
    ],
    references: &[],
};

pub static EMPLOYEE: EntitySpec = EntitySpec {
    name: "employee",
    table: "employees",
    id_column: "employee_id",
    fields: &[
        FieldSpec::required("first_name", FieldType::String),
        FieldSpec::required("last_name", FieldType::String),
        FieldSpec::required("position", FieldType::String),
        FieldSpec::required("hire_date", FieldType::Date),
    ],
    references: &[],
};

pub static CUSTOMER: EntitySpec = EntitySpec {
    name: "customer",
    table: "customers",
    id_column: "customer_id",
    fields: &[
        FieldSpec::required("first_name", FieldType::String),
        FieldSpec::required("last_name", FieldType::String),
        FieldSpec::required("email", FieldType::String),
        FieldSpec::required("join_date", FieldType::Date),
    ],
    references: &[],
};

pub static SALES_ORDER: EntitySpec = EntitySpec {
    name: "sales_order",
    table: "sales_orders",
    id_column: "order_id",
    fields: &[
        FieldSpec::required("product_id", FieldType::Int64),
        FieldSpec::required("quantity", FieldType::Int64),
        FieldSpec::required("employee_id", FieldType::Int64),
        FieldSpec::optional("customer_id", FieldType::Int64),
        FieldSpec::required("total_price", FieldType::Float64),
        FieldSpec::generated("order_date", FieldType::Timestamp, Generated::CommitTimestamp),
    ],
    references: &[
        Reference {
            field: "product_id",
            target: "product",
            on_delete: OnDelete::Cascade,
        },
        Reference {
            field: "employee_id",
            target: "employee",
            on_delete: OnDelete::Cascade,
        },
        Reference {
            field: "customer_id",
            target: "customer",
            on_delete: OnDelete::SetNull,
        },
    ],
};

static CATALOG: [&EntitySpec; 4] = [&PRODUCT, &EMPLOYEE, &CUSTOMER, &SALES_ORDER];

/// Every entity, in dependency order (referenced entities first)
pub fn all() -> &'static [&'static EntitySpec] {
    &CATALOG
}

/// Look up an entity by logical name or by table name
pub fn entity(name: &str) -> std::result::Result<&'static EntitySpec, ModelError> {
    let wanted = name.trim().to_ascii_lowercase();
    CATALOG
        .iter()
        .copied()
        .find(|e| e.name == wanted || e.table == wanted)
        .ok_or(ModelError::UnknownEntity {
            name: name.to_string(),
        })
}

/// Every (entity, reference) pair pointing at `target`
pub fn referencing(target: &EntitySpec) -> Vec<(&'static EntitySpec, &'static Reference)> {
    CATALOG
        .iter()
        .copied()
        .flat_map(|owner| {
            owner
                .references
                .iter()
                .filter(|r| r.target == target.name)
                .map(move |r| (owner, r))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name_and_table() {
        assert_eq!(entity("product").unwrap().table, "products");
        assert_eq!(entity("Sales_Orders").unwrap().name, "sales_order");
        assert!(matches!(
            entity("invoice"),
            Err(ModelError::UnknownEntity { .. })
        ));
    }

    #[test]
    fn test_record_shape_starts_with_id() {
        let cols = PRODUCT.columns();
        assert_eq!(
            cols,
            vec!["product_id", "name", "category", "price", "description"]
        );
        assert_eq!(PRODUCT.shape()[0], FieldType::Int64);
        assert_eq!(PRODUCT.position("price"), Some(3));
        assert_eq!(PRODUCT.position("product_id"), Some(0));
    }

    #[test]
    fn test_generated_fields_are_not_writable() {
        let writable: Vec<_> = SALES_ORDER.writable_fields().map(|f| f.name).collect();
        assert!(!writable.contains(&"order_date"));
        let generated: Vec<_> = SALES_ORDER.generated_fields().map(|f| f.name).collect();
        assert_eq!(generated, vec!["order_date"]);
    }

    #[test]
    fn test_references_resolve_to_catalog_entities() {
        for owner in all() {
            for r in owner.references {
                assert!(entity(r.target).is_ok(), "dangling reference {:?}", r);
                assert!(owner.field(r.field).is_some());
            }
        }
    }

    #[test]
    fn test_referencing_customer() {
        let refs = referencing(&CUSTOMER);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].0.name, "sales_order");
        assert_eq!(refs[0].1.on_delete, OnDelete::SetNull);
        assert!(referencing(&SALES_ORDER).is_empty());
    }
}
